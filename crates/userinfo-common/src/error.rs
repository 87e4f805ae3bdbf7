//! Error types for userinfo
//!
//! Store-level failures live in `userinfo-store`; this module covers record
//! encoding and configuration.

use thiserror::Error;

/// Common result type for userinfo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for userinfo
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Check if this error came from decoding persisted bytes
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Deserialization(_))
    }
}
