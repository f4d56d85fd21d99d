//! FADC250 firmware emulation: threshold crossings and pulse integration.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use crate::config::{FadcConfig, NS_PER_SAMPLE};
use crate::fit::PulseFitter;
use crate::pedestal::integration_range;
use fadcsim_core::ConfigError;
use std::sync::Arc;

/// Samples at the end of the buffer excluded from the maximum search.
///
/// Firmware constant carried over from the hardware emulation; it has
/// not been checked against real FADC output.
pub const MAX_SEARCH_MARGIN: usize = 5;

/// Samples skipped after a crossing when emulating the SSP.
pub const SSP_CROSSING_SKIP: usize = 8;

/// Samples averaged for the Mode-7 baseline.
const BASELINE_SAMPLES: usize = 4;

/// Raw measurement of one pulse in a Mode-1 waveform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseMeasurement {
    /// Sample index of the threshold crossing.
    pub threshold_crossing: usize,
    /// Pulse time (ns).
    pub time: f64,
    /// Integral of the raw samples, pedestal included (ADC).
    pub adc_sum: f64,
    /// Baseline estimate (ADC).
    pub min_adc: f64,
    /// Pulse height (ADC).
    pub max_adc: f64,
    /// Fit quality; non-positive means no usable fit.
    pub fit_quality: f64,
}

impl PulseMeasurement {
    /// Whether a pulse-shape fit produced the values.
    #[inline]
    pub fn is_fitted(&self) -> bool {
        self.fit_quality > 0.0
    }
}

/// Absolute threshold in ADC counts.
#[inline]
pub fn absolute_threshold(pedestal: f64, threshold: f64) -> i64 {
    (pedestal + threshold).floor() as i64
}

/// Finds rising threshold crossings.
///
/// A sample crosses when it is above `threshold` and its predecessor is
/// not; the first sample crosses if it is above threshold. After each
/// crossing the search resumes `step` samples later. At most
/// `max_crossings` indices are returned.
pub fn find_threshold_crossings(
    samples: &[i16],
    threshold: i64,
    step: usize,
    max_crossings: usize,
) -> Vec<usize> {
    let mut crossings = Vec::new();
    if max_crossings == 0 {
        return crossings;
    }

    let above = |i: usize| i64::from(samples[i]) > threshold;
    let step = step.max(1);
    let mut ii = 0;
    while ii < samples.len() {
        if above(ii) && (ii == 0 || !above(ii - 1)) {
            crossings.push(ii);
            if crossings.len() >= max_crossings {
                break;
            }
            ii += step;
        } else {
            ii += 1;
        }
    }
    crossings
}

/// Converts Mode-1 waveforms into pulse measurements.
#[derive(Clone)]
pub struct WaveformIntegrator {
    config: FadcConfig,
    fitter: Option<Arc<dyn PulseFitter>>,
}

impl WaveformIntegrator {
    /// Creates an integrator, validating the configuration.
    pub fn new(config: FadcConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            fitter: None,
        })
    }

    /// Attach a pulse fitter, used when fitting is enabled.
    #[must_use]
    pub fn with_fitter(mut self, fitter: Arc<dyn PulseFitter>) -> Self {
        self.fitter = Some(fitter);
        self
    }

    /// Get current configuration.
    pub fn config(&self) -> &FadcConfig {
        &self.config
    }

    /// Whether a fitter is attached.
    pub fn has_fitter(&self) -> bool {
        self.fitter.is_some()
    }

    fn crossing_step(&self) -> usize {
        if self.config.ssp_emulation {
            SSP_CROSSING_SKIP + 1
        } else {
            self.config.window.samples_after() as usize
        }
    }

    /// Finds and measures all pulses in a waveform.
    ///
    /// An empty waveform yields no pulses.
    pub fn find_pulses(&self, samples: &[i16], pedestal: f64) -> Vec<PulseMeasurement> {
        if samples.is_empty() {
            return Vec::new();
        }

        let threshold = absolute_threshold(pedestal, self.config.threshold);
        find_threshold_crossings(
            samples,
            threshold,
            self.crossing_step(),
            self.config.max_pulses as usize,
        )
        .into_iter()
        .map(|crossing| self.measure(samples, crossing))
        .collect()
    }

    /// Integrates the pulse at a known threshold crossing.
    pub fn measure(&self, samples: &[i16], crossing: usize) -> PulseMeasurement {
        let len = samples.len();
        let range = integration_range(&self.config.window, Some(len), crossing as i64);

        let mut adc_sum = 0.0;
        if !range.is_empty() {
            adc_sum = samples[range.first as usize..=range.last as usize]
                .iter()
                .map(|&s| i64::from(s))
                .sum::<i64>() as f64;
        }

        let baseline = &samples[..len.min(BASELINE_SAMPLES)];
        let mut min_adc = if baseline.is_empty() {
            0.0
        } else {
            baseline.iter().map(|&s| f64::from(s)).sum::<f64>() / baseline.len() as f64
        };

        let mut max_adc = 0.0;
        for jj in crossing..len.saturating_sub(MAX_SEARCH_MARGIN) {
            if samples[jj + 1] < samples[jj] {
                max_adc = f64::from(samples[jj]);
                break;
            }
        }

        let mut time = (crossing as f64) * f64::from(NS_PER_SAMPLE);

        if self.config.mode7_timing {
            if crossing < 4 {
                // firmware zeroes the maximum and keeps the coarse time
                max_adc = 0.0;
            } else if max_adc > 0.0 {
                let half_max = (max_adc + min_adc) / 2.0;
                let mut t0 = None;
                let mut ii = crossing - 1;
                while (ii as i64) < range.last && ii + 1 < len {
                    if f64::from(samples[ii]) <= half_max && f64::from(samples[ii + 1]) > half_max {
                        t0 = Some(ii);
                        break;
                    }
                    ii += 1;
                }
                if let Some(t0) = t0.filter(|&t0| t0 > 0) {
                    let a0 = f64::from(samples[t0]);
                    let a1 = f64::from(samples[t0 + 1]);
                    time = ((half_max - a0) / (a1 - a0) + t0 as f64) * f64::from(NS_PER_SAMPLE);
                }
            }
        }

        let mut fit_quality = -1.0;
        if self.config.use_fit {
            if let Some(fit) = self
                .fitter
                .as_ref()
                .and_then(|fitter| fitter.fit(samples, crossing, max_adc))
            {
                fit_quality = fit.quality;
                if fit.is_good() {
                    time = fit.time0 * f64::from(NS_PER_SAMPLE);
                    adc_sum = fit.integral;
                    min_adc = fit.pedestal;
                    max_adc = fit.maximum;
                }
            }
        }

        PulseMeasurement {
            threshold_crossing: crossing,
            time,
            adc_sum,
            min_adc,
            max_adc,
            fit_quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::PulseFit;
    use approx::assert_relative_eq;

    fn scenario_buffer() -> Vec<i16> {
        vec![
            100, 100, 100, 100, 150, 140, 130, 120, 110, 100, 100, 100, 100, 100, 100, 100,
        ]
    }

    fn integrator(config: FadcConfig) -> WaveformIntegrator {
        WaveformIntegrator::new(config).unwrap()
    }

    #[test]
    fn test_scenario_single_pulse() {
        let integ = integrator(FadcConfig::new().with_window(16, 8));
        let pulses = integ.find_pulses(&scenario_buffer(), 100.0);

        assert_eq!(pulses.len(), 1);
        let pulse = pulses[0];
        assert_eq!(pulse.threshold_crossing, 4);
        assert_relative_eq!(pulse.min_adc, 100.0);
        assert_relative_eq!(pulse.max_adc, 150.0);
        // samples 2..=7
        assert_relative_eq!(pulse.adc_sum, 740.0);
        // half-height 125 between samples 3 and 4
        assert_relative_eq!(pulse.time, 14.0);
        assert_relative_eq!(pulse.fit_quality, -1.0);
        assert!(!pulse.is_fitted());
    }

    #[test]
    fn test_mode7_keeps_coarse_time_without_half_height() {
        // low baseline puts the half height (85) below the sample before the crossing
        let mut samples = vec![20_i16, 20, 20, 20, 20, 110, 150, 140, 120, 110];
        samples.extend([100; 10]);
        let integ = integrator(FadcConfig::new().with_window(16, 8));
        let pulses = integ.find_pulses(&samples, 100.0);

        assert_eq!(pulses.len(), 1);
        let pulse = pulses[0];
        assert_eq!(pulse.threshold_crossing, 6);
        assert_relative_eq!(pulse.min_adc, 20.0);
        assert_relative_eq!(pulse.max_adc, 150.0);
        assert_relative_eq!(pulse.time, 24.0);
    }

    #[test]
    fn test_mode3_timing() {
        let integ = integrator(FadcConfig::new().with_window(16, 8).with_mode7_timing(false));
        let pulse = integ.find_pulses(&scenario_buffer(), 100.0)[0];
        assert_relative_eq!(pulse.time, 16.0);
        assert_relative_eq!(pulse.max_adc, 150.0);
    }

    #[test]
    fn test_crossing_at_first_sample() {
        let mut samples = vec![100_i16; 16];
        samples[0] = 113;
        let integ = integrator(FadcConfig::new().with_window(16, 8));
        let pulses = integ.find_pulses(&samples, 100.0);

        assert_eq!(pulses.len(), 1);
        assert_eq!(pulses[0].threshold_crossing, 0);
        assert_relative_eq!(pulses[0].time, 0.0);
        assert_relative_eq!(pulses[0].max_adc, 0.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut samples = vec![100_i16; 16];
        samples[6] = 112;
        let integ = integrator(FadcConfig::new().with_window(16, 8));
        assert!(integ.find_pulses(&samples, 100.0).is_empty());
        assert_eq!(absolute_threshold(100.7, 12.0), 112);
    }

    #[test]
    fn test_max_pulses_limit() {
        let mut samples = vec![100_i16; 40];
        samples[5] = 200;
        samples[25] = 200;

        let one = integrator(FadcConfig::new().with_window(16, 8).with_max_pulses(1));
        let pulses = one.find_pulses(&samples, 100.0);
        assert_eq!(pulses.len(), 1);
        assert_eq!(pulses[0].threshold_crossing, 5);

        let three = integrator(FadcConfig::new().with_window(16, 8));
        let crossings: Vec<usize> = three
            .find_pulses(&samples, 100.0)
            .iter()
            .map(|p| p.threshold_crossing)
            .collect();
        assert_eq!(crossings, vec![5, 25]);
    }

    #[test]
    fn test_no_retrigger_inside_window() {
        let mut samples = vec![100_i16; 20];
        samples[5] = 200;
        samples[7] = 200;
        samples[10] = 200;
        samples[14] = 200;

        assert_eq!(find_threshold_crossings(&samples, 112, 4, 3), vec![5, 10, 14]);
    }

    #[test]
    fn test_ssp_skip() {
        let mut samples = vec![100_i16; 20];
        samples[5] = 200;
        samples[10] = 200;
        samples[14] = 200;

        let integ = integrator(FadcConfig::new().with_window(16, 8).with_ssp_emulation(true));
        let crossings: Vec<usize> = integ
            .find_pulses(&samples, 100.0)
            .iter()
            .map(|p| p.threshold_crossing)
            .collect();
        assert_eq!(crossings, vec![5, 14]);
    }

    #[test]
    fn test_empty_buffer() {
        let integ = integrator(FadcConfig::default());
        assert!(integ.find_pulses(&[], 100.0).is_empty());
    }

    #[test]
    fn test_short_buffer_full_integration() {
        let samples: Vec<i16> = vec![100, 100, 100, 100, 200, 180, 100, 100];
        let integ = integrator(FadcConfig::default());
        let pulse = integ.find_pulses(&samples, 100.0)[0];
        assert_relative_eq!(pulse.adc_sum, samples.iter().map(|&s| f64::from(s)).sum::<f64>());
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(WaveformIntegrator::new(FadcConfig::new().with_window(6, 8)).is_err());
        assert!(WaveformIntegrator::new(FadcConfig::new().with_max_pulses(5)).is_err());
    }

    struct FixedFit(PulseFit);

    impl PulseFitter for FixedFit {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn fit(&self, _samples: &[i16], _crossing: usize, _max_adc: f64) -> Option<PulseFit> {
            Some(self.0)
        }
    }

    #[test]
    fn test_good_fit_replaces_measurement() {
        let fit = PulseFit {
            quality: 0.9,
            time0: 3.25,
            integral: 512.0,
            pedestal: 99.5,
            maximum: 151.0,
        };
        let integ = integrator(FadcConfig::new().with_window(16, 8).with_fit(true))
            .with_fitter(Arc::new(FixedFit(fit)));
        let pulse = integ.find_pulses(&scenario_buffer(), 100.0)[0];

        assert!(pulse.is_fitted());
        assert_relative_eq!(pulse.time, 13.0);
        assert_relative_eq!(pulse.adc_sum, 512.0);
        assert_relative_eq!(pulse.min_adc, 99.5);
        assert_relative_eq!(pulse.max_adc, 151.0);
    }

    #[test]
    fn test_failed_fit_keeps_raw_values() {
        let fit = PulseFit {
            quality: 0.0,
            time0: 3.25,
            integral: 512.0,
            pedestal: 99.5,
            maximum: 151.0,
        };
        let integ = integrator(FadcConfig::new().with_window(16, 8).with_fit(true))
            .with_fitter(Arc::new(FixedFit(fit)));
        let pulse = integ.find_pulses(&scenario_buffer(), 100.0)[0];

        assert!(!pulse.is_fitted());
        assert_relative_eq!(pulse.fit_quality, 0.0);
        assert_relative_eq!(pulse.adc_sum, 740.0);
    }
}
