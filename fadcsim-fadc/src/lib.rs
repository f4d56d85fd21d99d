//! fadcsim-fadc: FADC250 waveform integration and hit calibration.
//!
//! This crate emulates the pulse processing of the FADC250 firmware and
//! turns its output into calibrated calorimeter hits.
//!
//! # Key Components
//!
//! - [`FadcConfig`] - Integration window, threshold and readout options
//! - [`WaveformIntegrator`] - Threshold crossings and pulse integration (Mode-1)
//! - [`integration_range`] / [`total_pedestal`] - Pedestal accounting with window clipping
//! - [`HitCalibrator`] - Mode-1/3/7 conversion to energy and time, and its inverse
//! - [`RawConverter`] - Per-event parallel conversion against the conditions table
//!
//! # Processing Pipeline
//!
//! 1. Find threshold crossings and integrate each pulse
//! 2. Subtract the pedestal of exactly the integrated samples
//! 3. Apply gain and time shift

mod calibrator;
mod config;
mod converter;
mod error;
mod fit;
mod integrator;
mod pedestal;
pub mod tables;

pub use calibrator::{BoundCalibrator, HitCalibrator, Mode7Pulse};
pub use config::{FadcConfig, IntegrationWindow, NS_PER_SAMPLE};
pub use converter::{
    ChannelPedestal, ConversionStatistics, RawConverter, RawConverterBuilder, RawEvent, Waveform,
};
pub use error::{Error, Result};
pub use fit::{PulseFit, PulseFitter};
pub use integrator::{
    absolute_threshold, find_threshold_crossings, PulseMeasurement, WaveformIntegrator,
    MAX_SEARCH_MARGIN, SSP_CROSSING_SKIP,
};
pub use pedestal::{integration_range, total_pedestal, SampleRange};

// Re-export core types for convenience
pub use fadcsim_core::{CalibratedHit, ChannelId, RawPulse};
