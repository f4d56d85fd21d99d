//! Conversion between ADC pulses and calibrated hits.
#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use crate::config::{FadcConfig, IntegrationWindow, NS_PER_SAMPLE};
use crate::integrator::PulseMeasurement;
use crate::pedestal::total_pedestal;
use fadcsim_core::units::MEV;
use fadcsim_core::{
    CalibratedHit, CalibrationConstants, CalibrationProvider, ChannelId, PulseCalibration,
    RawPulse, Result,
};
use serde::{Deserialize, Serialize};

/// Mode-3 timestamps are expected on 4 ns boundaries (64 ticks).
const TIMESTAMP_ALIGNMENT: i64 = 64;

/// Timestamp ticks per ns.
const TICKS_PER_NS: f64 = 16.0;

/// Mode-7 pulse: a Mode-3 pulse plus the firmware's baseline and peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mode7Pulse {
    /// Integral and timestamp.
    pub pulse: RawPulse,
    /// Baseline reported by the firmware (ADC).
    pub min: i32,
    /// Peak reported by the firmware (ADC).
    pub max: i32,
}

/// Converts integrated pulses into energy and time.
///
/// The per-channel methods are pure; the `calibrate_*` methods first
/// look the channel up and fail with `ChannelNotFound` when it has no
/// constants.
#[derive(Debug, Clone, Copy)]
pub struct HitCalibrator {
    window: IntegrationWindow,
    window_samples: Option<usize>,
}

impl HitCalibrator {
    /// Creates a calibrator for the given FADC settings.
    pub fn new(config: &FadcConfig) -> Self {
        Self {
            window: config.window,
            window_samples: config.window_samples(),
        }
    }

    /// Mode-1: calibrate a pulse measured in a waveform of `samples_len` samples.
    ///
    /// Fitted pulses are already pedestal-free; otherwise the pedestal of
    /// the integrated samples is removed.
    pub fn mode1_hit(
        &self,
        channel: ChannelId,
        pulse: &PulseMeasurement,
        samples_len: usize,
        constants: &CalibrationConstants,
    ) -> CalibratedHit {
        let mut sum = pulse.adc_sum;
        if !pulse.is_fitted() {
            sum -= total_pedestal(
                constants.pedestal,
                &self.window,
                Some(samples_len),
                pulse.threshold_crossing as i64,
            );
        }
        CalibratedHit::new(channel, constants.gain * sum * MEV, pulse.time)
    }

    /// Mode-3: calibrate a pre-integrated pulse.
    pub fn mode3_hit(
        &self,
        pulse: &RawPulse,
        time_offset: f64,
        constants: &CalibrationConstants,
    ) -> CalibratedHit {
        if pulse.timestamp % TIMESTAMP_ALIGNMENT != 0 {
            log::warn!(
                "unexpected timestamp {} on channel {}",
                pulse.timestamp,
                pulse.channel
            );
        }
        self.integrated_hit(pulse, time_offset, constants)
    }

    /// Mode-7: calibrate a pre-integrated pulse with firmware extras.
    ///
    /// The baseline and peak do not enter the energy.
    pub fn mode7_hit(
        &self,
        pulse: &Mode7Pulse,
        time_offset: f64,
        constants: &CalibrationConstants,
    ) -> CalibratedHit {
        self.integrated_hit(&pulse.pulse, time_offset, constants)
    }

    fn integrated_hit(
        &self,
        pulse: &RawPulse,
        time_offset: f64,
        constants: &CalibrationConstants,
    ) -> CalibratedHit {
        let time = pulse.timestamp as f64 / TICKS_PER_NS;
        let crossing = (time / f64::from(NS_PER_SAMPLE)).floor() as i64;
        let pedestal = total_pedestal(constants.pedestal, &self.window, self.window_samples, crossing);
        let energy = constants.gain * (f64::from(pulse.amplitude) - pedestal) * MEV;
        CalibratedHit::new(
            pulse.channel,
            energy,
            time - constants.time_shift + time_offset,
        )
    }

    /// Integrates the whole waveform with no pulse finding; time is zero.
    pub fn window_sum_hit(
        &self,
        channel: ChannelId,
        samples: &[i16],
        constants: &CalibrationConstants,
    ) -> CalibratedHit {
        let sum: f64 = samples
            .iter()
            .map(|&s| f64::from(s) - constants.pedestal)
            .sum();
        CalibratedHit::new(channel, constants.gain * sum * MEV, 0.0)
    }

    /// Inverse of Mode-3 calibration: the pulse a hit would have been read out as.
    pub fn digitize(&self, hit: &CalibratedHit, constants: &CalibrationConstants) -> RawPulse {
        let samples = hit.time / f64::from(NS_PER_SAMPLE);
        let timestamp = samples.round() as i64 * TIMESTAMP_ALIGNMENT;
        let pedestal = total_pedestal(
            constants.pedestal,
            &self.window,
            self.window_samples,
            samples.floor() as i64,
        );
        let amplitude = (hit.energy / MEV / constants.gain + pedestal).round() as i32;
        RawPulse::new(hit.channel, amplitude, timestamp)
    }

    /// Mode-1 calibration with constants from a provider.
    pub fn calibrate_mode1<P: CalibrationProvider + ?Sized>(
        &self,
        channel: ChannelId,
        pulse: &PulseMeasurement,
        samples_len: usize,
        provider: &P,
    ) -> Result<CalibratedHit> {
        let constants = provider.constants(channel)?;
        Ok(self.mode1_hit(channel, pulse, samples_len, &constants))
    }

    /// Mode-3 calibration with constants from a provider.
    pub fn calibrate_mode3<P: CalibrationProvider + ?Sized>(
        &self,
        pulse: &RawPulse,
        time_offset: f64,
        provider: &P,
    ) -> Result<CalibratedHit> {
        let constants = provider.constants(pulse.channel)?;
        Ok(self.mode3_hit(pulse, time_offset, &constants))
    }

    /// Mode-7 calibration with constants from a provider.
    pub fn calibrate_mode7<P: CalibrationProvider + ?Sized>(
        &self,
        pulse: &Mode7Pulse,
        time_offset: f64,
        provider: &P,
    ) -> Result<CalibratedHit> {
        let constants = provider.constants(pulse.pulse.channel)?;
        Ok(self.mode7_hit(pulse, time_offset, &constants))
    }

    /// Digitize with constants from a provider.
    pub fn digitize_with<P: CalibrationProvider + ?Sized>(
        &self,
        hit: &CalibratedHit,
        provider: &P,
    ) -> Result<RawPulse> {
        let constants = provider.constants(hit.channel)?;
        Ok(self.digitize(hit, &constants))
    }

    /// Pairs the calibrator with a provider for pulse-energy lookups.
    pub fn bind<'a, P: CalibrationProvider + ?Sized>(&'a self, provider: &'a P) -> BoundCalibrator<'a, P> {
        BoundCalibrator {
            calibrator: self,
            provider,
        }
    }
}

/// A calibrator paired with its constants.
pub struct BoundCalibrator<'a, P: ?Sized> {
    calibrator: &'a HitCalibrator,
    provider: &'a P,
}

impl<P: CalibrationProvider + ?Sized> PulseCalibration for BoundCalibrator<'_, P> {
    fn pulse_energy(&self, pulse: &RawPulse) -> Result<f64> {
        Ok(self
            .calibrator
            .calibrate_mode3(pulse, 0.0, self.provider)?
            .energy)
    }
}
