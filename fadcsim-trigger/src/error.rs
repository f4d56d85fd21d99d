//! Trigger-specific error types.

use fadcsim_core::ConfigError;
use thiserror::Error;

/// Result type for trigger configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

/// Trigger configuration loading errors.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed JSON document.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] fadcsim_core::Error),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::CoreError(err.into())
    }
}
