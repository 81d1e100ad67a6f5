//! Error types for storage access and settings validation.

use std::{fmt, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type for the settings crate.
pub type Result<T> = StdResult<T, Error>;

/// Storage operation kind, used to pick candidate areas and to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Read a set of keys.
    Get,
    /// Write a set of key/value pairs.
    Set,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("get"),
            Self::Set => f.write_str("set"),
        }
    }
}

/// A failure reported by a single storage area.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{area}: {message}")]
pub struct AreaError {
    /// Name of the area that failed.
    pub area: String,
    /// Human-readable error message.
    pub message: String,
}

impl AreaError {
    /// Construct an area error from its parts.
    pub fn new(area: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            area: area.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by the storage gateway, the store, and input validation.
#[derive(Debug, Error, Clone)]
pub enum Error {
    /// No configured storage area supports the requested operation.
    #[error("storage API unavailable for {0}")]
    StorageUnavailable(Op),

    /// Every candidate area failed; carries the last area error.
    #[error("storage {op} failed: {source}")]
    StorageOpFailed {
        /// Operation that failed.
        op: Op,
        /// Error from the last area tried.
        #[source]
        source: AreaError,
    },

    /// User input failed local validation and never reached storage.
    #[error("invalid input: {0}")]
    ValidationRejected(String),
}
