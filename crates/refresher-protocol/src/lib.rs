use serde::{Deserialize, Serialize};
pub use settings::Settings;

/// Wire tag carried by settings change notifications.
pub const SETTINGS_CHANGED: &str = "SETTINGS_CHANGED";

/// Messages exchanged between extension contexts.
///
/// Encoded as a JSON object tagged by `type`, e.g.
/// `{"type": "SETTINGS_CHANGED", "settings": {"enabled": true, "intervalSeconds": 5}}`.
/// Messages with any other tag decode as [`Message::Unknown`] and are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// A controller persisted new settings.
    #[serde(rename = "SETTINGS_CHANGED")]
    SettingsChanged {
        /// The settings now stored. Normalized again on decode; a missing
        /// field decodes as the defaults.
        #[serde(default)]
        settings: Settings,
    },

    /// Any message this crate does not recognize.
    #[serde(other)]
    Unknown,
}

impl Message {
    /// Build a settings change notification.
    pub fn settings_changed(settings: Settings) -> Self {
        Self::SettingsChanged { settings }
    }

    /// Settings carried by this message, if it is a change notification.
    pub fn settings(&self) -> Option<Settings> {
        match self {
            Self::SettingsChanged { settings } => Some(*settings),
            Self::Unknown => None,
        }
    }
}

/// IPC-related helpers: the in-process bus and the message codec.
pub mod ipc {
    mod bus;
    /// JSON codec for messages crossing a byte-level transport.
    pub mod codec;

    pub use bus::{Bus, Listener, MessageSink, SendError};
}
