//! fadcsim-core: Core types for FADC hit reconstruction and triggering.
//!
//! This crate provides the shared vocabulary of the readout chain:
//! channel identifiers and crystal geometry, calibrated hits, clusters,
//! per-channel calibration constants and the swappable conditions table.
//!

pub mod calibration;
pub mod channel;
pub mod cluster;
pub mod error;
pub mod hit;

pub use calibration::{
    reload, CalibrationConstants, CalibrationProvider, ChannelRecord, ChannelTable,
    ConditionsHandle, ConditionsObserver,
};
pub use channel::{ChannelId, CrystalIndex};
pub use cluster::Cluster;
pub use error::{ConfigError, Error, GeometryError, Result};
pub use hit::{CalibratedHit, Hit, HitKind, PulseCalibration, RawPulse, TruthHit};

/// Energy units used throughout the readout chain (GeV based).
pub mod units {
    /// One MeV expressed in GeV.
    pub const MEV: f64 = 1.0e-3;
}
