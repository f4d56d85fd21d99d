//! FADC-specific error types.

use fadcsim_core::{ConfigError, GeometryError};
use thiserror::Error;

/// Result type for FADC operations.
pub type Result<T> = std::result::Result<T, Error>;

/// FADC-specific error types.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading a configuration or table file.
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

impl From<GeometryError> for Error {
    fn from(err: GeometryError) -> Self {
        Self::CoreError(err.into())
    }
}
