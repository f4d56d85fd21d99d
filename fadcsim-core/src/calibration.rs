//! Per-channel calibration constants and the conditions table.
//!
//! A [`ChannelTable`] is built once per detector configuration by
//! [`reload`] and never mutated afterwards. Readers share it through a
//! [`ConditionsHandle`], which replaces the whole table in one step so
//! that no conversion ever observes a half-updated set of constants.

use crate::channel::{ChannelId, CrystalIndex};
use crate::error::{ConfigError, Error, GeometryError, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Calibration constants for a single channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationConstants {
    /// Energy per ADC count (MeV/ADC).
    pub gain: f64,
    /// Baseline per sample (ADC).
    pub pedestal: f64,
    /// Time offset subtracted from pulse times (ns).
    pub time_shift: f64,
}

impl CalibrationConstants {
    /// Creates a new set of constants.
    pub fn new(gain: f64, pedestal: f64, time_shift: f64) -> Self {
        Self {
            gain,
            pedestal,
            time_shift,
        }
    }

    /// Same constants with a different per-sample pedestal.
    #[must_use]
    pub fn with_pedestal(mut self, pedestal: f64) -> Self {
        self.pedestal = pedestal;
        self
    }
}

/// Source of per-channel calibration constants.
///
/// Every accessor fails with [`Error::ChannelNotFound`] for channels
/// without constants; there is no silent default.
pub trait CalibrationProvider: Send + Sync {
    /// All constants for a channel.
    fn constants(&self, channel: ChannelId) -> Result<CalibrationConstants>;

    /// Gain for a channel.
    fn gain(&self, channel: ChannelId) -> Result<f64> {
        Ok(self.constants(channel)?.gain)
    }

    /// Per-sample pedestal for a channel.
    fn pedestal(&self, channel: ChannelId) -> Result<f64> {
        Ok(self.constants(channel)?.pedestal)
    }

    /// Time shift for a channel.
    fn time_shift(&self, channel: ChannelId) -> Result<f64> {
        Ok(self.constants(channel)?.time_shift)
    }
}

/// One row of a conditions collection: geometry plus calibration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelRecord {
    /// Readout channel.
    pub channel: ChannelId,
    /// Crystal x-index.
    pub ix: i32,
    /// Crystal y-index.
    pub iy: i32,
    /// Energy per ADC count (MeV/ADC).
    pub gain: f64,
    /// Baseline per sample (ADC).
    pub pedestal: f64,
    /// Time shift (ns).
    #[cfg_attr(feature = "serde", serde(default))]
    pub time_shift: f64,
}

impl ChannelRecord {
    /// Creates a new record.
    pub fn new(channel: ChannelId, ix: i32, iy: i32, gain: f64, pedestal: f64, time_shift: f64) -> Self {
        Self {
            channel,
            ix,
            iy,
            gain,
            pedestal,
            time_shift,
        }
    }
}

/// Immutable channel map for one detector configuration.
#[derive(Debug, Clone, Default)]
pub struct ChannelTable {
    constants: HashMap<ChannelId, CalibrationConstants>,
    crystals: HashMap<ChannelId, CrystalIndex>,
}

/// Builds a channel table from a conditions collection.
///
/// Invalid crystal indices and duplicate channels are geometry errors;
/// non-finite constants are configuration errors. Either way no table
/// is produced.
pub fn reload(records: &[ChannelRecord]) -> Result<ChannelTable> {
    let mut table = ChannelTable {
        constants: HashMap::with_capacity(records.len()),
        crystals: HashMap::with_capacity(records.len()),
    };

    for record in records {
        let index = CrystalIndex::new(record.ix, record.iy)?;
        for (name, value) in [
            ("gain", record.gain),
            ("pedestal", record.pedestal),
            ("time_shift", record.time_shift),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue {
                    name: format!("{name} of channel {}", record.channel),
                    value: value.to_string(),
                }
                .into());
            }
        }

        let constants = CalibrationConstants::new(record.gain, record.pedestal, record.time_shift);
        if table.constants.insert(record.channel, constants).is_some() {
            return Err(GeometryError::DuplicateChannel(record.channel).into());
        }
        table.crystals.insert(record.channel, index);
    }

    log::debug!("loaded conditions for {} channels", table.len());
    Ok(table)
}

impl ChannelTable {
    /// Number of channels.
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Returns true if the table holds no channels.
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Crystal index of a channel.
    pub fn crystal(&self, channel: ChannelId) -> Result<CrystalIndex> {
        self.crystals
            .get(&channel)
            .copied()
            .ok_or_else(|| GeometryError::UnmappedChannel(channel).into())
    }

    /// Iterates over the channels in the table, in no particular order.
    pub fn channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.constants.keys().copied()
    }
}

impl CalibrationProvider for ChannelTable {
    fn constants(&self, channel: ChannelId) -> Result<CalibrationConstants> {
        self.constants
            .get(&channel)
            .copied()
            .ok_or(Error::ChannelNotFound(channel))
    }
}

/// Notified after a new conditions table has been installed.
pub trait ConditionsObserver: Send + Sync {
    /// Called with the table that is now current.
    fn conditions_changed(&self, table: &ChannelTable);
}

/// Shared, atomically replaceable conditions table.
///
/// Readers take an `Arc` snapshot and keep it for a whole processing
/// pass; a reload only affects snapshots taken afterwards.
pub struct ConditionsHandle {
    current: RwLock<Arc<ChannelTable>>,
    observers: RwLock<Vec<Box<dyn ConditionsObserver>>>,
}

impl ConditionsHandle {
    /// Creates a handle holding the given table.
    pub fn new(table: ChannelTable) -> Self {
        Self {
            current: RwLock::new(Arc::new(table)),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Current table.
    pub fn snapshot(&self) -> Arc<ChannelTable> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Installs a new table and returns the previous one.
    pub fn swap(&self, table: ChannelTable) -> Arc<ChannelTable> {
        let table = Arc::new(table);
        let previous = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, Arc::clone(&table))
        };

        for observer in self.observers.read().unwrap_or_else(PoisonError::into_inner).iter() {
            observer.conditions_changed(&table);
        }
        previous
    }

    /// Rebuilds the table from a conditions collection and installs it.
    ///
    /// On error the current table stays in place.
    pub fn reload(&self, records: &[ChannelRecord]) -> Result<()> {
        let table = reload(records)?;
        log::info!("conditions reloaded: {} channels", table.len());
        self.swap(table);
        Ok(())
    }

    /// Registers an observer for table changes.
    pub fn add_observer(&self, observer: Box<dyn ConditionsObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }
}

impl Default for ConditionsHandle {
    fn default() -> Self {
        Self::new(ChannelTable::default())
    }
}
