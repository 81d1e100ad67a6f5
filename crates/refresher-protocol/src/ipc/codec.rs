use thiserror::Error;

use crate::Message;

/// Errors from encoding/decoding messages.
#[derive(Debug, Error)]
pub enum Error {
    /// The payload was not valid JSON or lacked a `type` tag.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Encode a message as JSON bytes.
pub fn encode(msg: &Message) -> Result<Vec<u8>, Error> {
    Ok(serde_json::to_vec(msg)?)
}

/// Decode JSON bytes into a message.
///
/// # Errors
/// Returns an error when the payload is not a JSON object with a string `type`
/// field. Unrecognized tags decode to [`Message::Unknown`] rather than failing.
pub fn decode(bytes: &[u8]) -> Result<Message, Error> {
    Ok(serde_json::from_slice(bytes)?)
}
