//! Error types for fadcsim-core.

use crate::channel::ChannelId;
use thiserror::Error;

/// Result type alias for fadcsim operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Invalid or incomplete configuration. Always fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Integration window length is not a whole number of samples.
    #[error("{name} must be a multiple of 4 ns, got {value}")]
    NotSampleMultiple { name: &'static str, value: i32 },

    /// Integration window length is negative.
    #[error("{name} must be non-negative, got {value}")]
    Negative { name: &'static str, value: i32 },

    /// Pulse limit outside what the firmware supports.
    #[error("maximum pulses must be 1, 2, or 3, got {0}")]
    InvalidMaxPulses(u32),

    /// A required parameter was never set.
    #[error("required parameter `{0}` is not set")]
    Missing(&'static str),

    /// A parameter holds a value that cannot be used.
    #[error("invalid value for `{name}`: {value}")]
    InvalidValue { name: String, value: String },

    /// Cut name not recognized.
    #[error("unknown cut `{0}`")]
    UnknownCut(String),

    /// Cut string token that does not parse as a number.
    #[error("argument for `{name}` improperly formatted: {token}")]
    MalformedCutValue { name: &'static str, token: String },
}

/// Detector geometry mismatch. Always fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// Channel has no crystal index in the loaded table.
    #[error("channel {0} maps to no crystal")]
    UnmappedChannel(ChannelId),

    /// Crystal index outside the calorimeter.
    #[error("invalid crystal index ({ix}, {iy})")]
    InvalidIndex { ix: i32, iy: i32 },

    /// Same channel listed twice in a conditions table.
    #[error("channel {0} appears more than once")]
    DuplicateChannel(ChannelId),
}

/// Core error types for fadcsim operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No calibration constants for a channel.
    #[error("no calibration constants for channel {0}")]
    ChannelNotFound(ChannelId),

    /// Geometry error.
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Cluster built without hits.
    #[error("cannot build a cluster without hits")]
    EmptyCluster,
}

impl Error {
    /// Whether the error invalidates the whole run rather than a single channel.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::ChannelNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_not_found_is_recoverable() {
        assert!(!Error::ChannelNotFound(ChannelId::new(7)).is_fatal());
        assert!(Error::EmptyCluster.is_fatal());
        assert!(Error::from(ConfigError::InvalidMaxPulses(4)).is_fatal());
        assert!(Error::from(GeometryError::InvalidIndex { ix: 0, iy: 1 }).is_fatal());
    }

    #[test]
    fn test_messages() {
        let err = Error::from(ConfigError::NotSampleMultiple {
            name: "NSA",
            value: 10,
        });
        assert_eq!(
            err.to_string(),
            "configuration error: NSA must be a multiple of 4 ns, got 10"
        );
    }
}
