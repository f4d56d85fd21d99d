//! Hit traits and types for calorimeter readout.

use crate::calibration::ChannelTable;
use crate::channel::{ChannelId, CrystalIndex};
use crate::error::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Calibrated energy deposit in one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibratedHit {
    /// Readout channel.
    pub channel: ChannelId,
    /// Energy (GeV).
    pub energy: f64,
    /// Time (ns).
    pub time: f64,
}

impl CalibratedHit {
    /// Creates a new calibrated hit.
    #[inline]
    pub fn new(channel: ChannelId, energy: f64, time: f64) -> Self {
        Self {
            channel,
            energy,
            time,
        }
    }
}

/// Pre-integrated FADC pulse as reported in Mode-3 readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawPulse {
    /// Readout channel.
    pub channel: ChannelId,
    /// Pulse integral including pedestal (ADC).
    pub amplitude: i32,
    /// Threshold-crossing time in 1/16 ns ticks.
    pub timestamp: i64,
}

impl RawPulse {
    /// Creates a new raw pulse.
    #[inline]
    pub fn new(channel: ChannelId, amplitude: i32, timestamp: i64) -> Self {
        Self {
            channel,
            amplitude,
            timestamp,
        }
    }
}

/// Simulated energy deposit with known crystal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruthHit {
    /// Readout channel.
    pub channel: ChannelId,
    /// Crystal the deposit belongs to.
    pub index: CrystalIndex,
    /// Deposited energy (GeV).
    pub energy: f64,
    /// Time (ns).
    pub time: f64,
}

/// Trait for hits carrying a channel, energy and time.
pub trait Hit: Send + Sync {
    /// Returns the readout channel.
    fn channel(&self) -> ChannelId;

    /// Returns the energy (GeV).
    fn energy(&self) -> f64;

    /// Returns the time (ns).
    fn time(&self) -> f64;
}

impl Hit for CalibratedHit {
    #[inline]
    fn channel(&self) -> ChannelId {
        self.channel
    }

    #[inline]
    fn energy(&self) -> f64 {
        self.energy
    }

    #[inline]
    fn time(&self) -> f64 {
        self.time
    }
}

impl Hit for TruthHit {
    #[inline]
    fn channel(&self) -> ChannelId {
        self.channel
    }

    #[inline]
    fn energy(&self) -> f64 {
        self.energy
    }

    #[inline]
    fn time(&self) -> f64 {
        self.time
    }
}

/// Converts a raw pulse to energy using per-channel calibration.
pub trait PulseCalibration {
    /// Energy (GeV) of a pre-integrated pulse.
    fn pulse_energy(&self, pulse: &RawPulse) -> Result<f64>;
}

/// A hit at one of the three stages of the readout chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitKind {
    /// Monte Carlo truth deposit.
    Truth(TruthHit),
    /// Hit already converted to energy and time.
    Preprocessed(CalibratedHit),
    /// Digitized pulse still in ADC units.
    Digitized(RawPulse),
}

impl HitKind {
    /// Returns the readout channel.
    pub fn channel(&self) -> ChannelId {
        match self {
            HitKind::Truth(hit) => hit.channel(),
            HitKind::Preprocessed(hit) => hit.channel(),
            HitKind::Digitized(pulse) => pulse.channel,
        }
    }

    /// Crystal index of the hit.
    ///
    /// Truth hits carry their own index; the other kinds are looked up in
    /// the channel table and fail with a geometry error if unmapped.
    pub fn indices(&self, table: &ChannelTable) -> Result<CrystalIndex> {
        match self {
            HitKind::Truth(hit) => Ok(hit.index),
            HitKind::Preprocessed(_) | HitKind::Digitized(_) => table.crystal(self.channel()),
        }
    }

    /// Energy of the hit (GeV).
    pub fn energy<C: PulseCalibration + ?Sized>(&self, calibration: &C) -> Result<f64> {
        match self {
            HitKind::Truth(hit) => Ok(hit.energy()),
            HitKind::Preprocessed(hit) => Ok(hit.energy()),
            HitKind::Digitized(pulse) => calibration.pulse_energy(pulse),
        }
    }
}
