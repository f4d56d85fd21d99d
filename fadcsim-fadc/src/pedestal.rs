//! Pedestal accounting for integrated pulses.
//!
//! The firmware integrates a window around each threshold crossing and
//! clips it at the edges of the readout window. The pedestal removed
//! from an integral has to cover exactly the samples that went into it,
//! so both the integrator and the calibrator take their bounds from
//! [`integration_range`].

use crate::config::IntegrationWindow;

/// Inclusive range of sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRange {
    /// First sample.
    pub first: i64,
    /// Last sample.
    pub last: i64,
}

impl SampleRange {
    /// Number of samples in the range; empty ranges count zero.
    #[inline]
    pub fn len(&self) -> i64 {
        (self.last - self.first + 1).max(0)
    }

    /// Returns true if the range holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Samples the firmware integrates for a crossing.
///
/// With a known readout length the nominal window
/// `[crossing - NSB/4, crossing + NSA/4 - 1]` is clipped to
/// `[0, window_samples - 1]`, and a window at least as long as the
/// readout integrates the whole readout. Without one the nominal
/// window is returned unclipped.
pub fn integration_range(
    window: &IntegrationWindow,
    window_samples: Option<usize>,
    crossing: i64,
) -> SampleRange {
    let first = crossing - window.samples_before();
    let last = crossing + window.samples_after() - 1;

    match window_samples.and_then(|n| i64::try_from(n).ok()) {
        Some(n) if window.total_samples() >= n => SampleRange { first: 0, last: n - 1 },
        Some(n) => SampleRange {
            first: first.max(0),
            last: last.min(n - 1),
        },
        None => SampleRange { first, last },
    }
}

/// Total pedestal of an integrated pulse.
#[allow(clippy::cast_precision_loss)]
pub fn total_pedestal(
    pedestal_per_sample: f64,
    window: &IntegrationWindow,
    window_samples: Option<usize>,
    crossing: i64,
) -> f64 {
    integration_range(window, window_samples, crossing).len() as f64 * pedestal_per_sample
}
