//! FADC pulse-processing configuration.

use fadcsim_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::Result;

/// Duration of one FADC sample (ns).
pub const NS_PER_SAMPLE: i32 = 4;

/// Integration range around a threshold crossing.
///
/// Both lengths are in ns and must be non-negative multiples of
/// [`NS_PER_SAMPLE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationWindow {
    /// Time integrated after the crossing (ns).
    pub nsa: i32,
    /// Time integrated before the crossing (ns).
    pub nsb: i32,
}

impl Default for IntegrationWindow {
    fn default() -> Self {
        // Values used during the 2014 run.
        Self { nsa: 100, nsb: 20 }
    }
}

impl IntegrationWindow {
    /// Creates a validated window.
    pub fn new(nsa: i32, nsb: i32) -> std::result::Result<Self, ConfigError> {
        let window = Self { nsa, nsb };
        window.validate()?;
        Ok(window)
    }

    /// Checks sign and sample alignment of both lengths.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (name, value) in [("NSA", self.nsa), ("NSB", self.nsb)] {
            if value < 0 {
                return Err(ConfigError::Negative { name, value });
            }
            if value % NS_PER_SAMPLE != 0 {
                return Err(ConfigError::NotSampleMultiple { name, value });
            }
        }
        Ok(())
    }

    /// Samples integrated after the crossing.
    #[inline]
    pub fn samples_after(&self) -> i64 {
        i64::from(self.nsa / NS_PER_SAMPLE)
    }

    /// Samples integrated before the crossing.
    #[inline]
    pub fn samples_before(&self) -> i64 {
        i64::from(self.nsb / NS_PER_SAMPLE)
    }

    /// Nominal number of integrated samples.
    #[inline]
    pub fn total_samples(&self) -> i64 {
        i64::from((self.nsa + self.nsb) / NS_PER_SAMPLE)
    }
}

/// Configuration for FADC pulse processing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FadcConfig {
    /// Integration window.
    pub window: IntegrationWindow,
    /// Leading-edge threshold above pedestal (ADC).
    pub threshold: f64,
    /// Maximum pulses searched per waveform (1, 2 or 3).
    pub max_pulses: u32,
    /// Use Mode-7 half-height timing instead of 4 ns crossing time.
    pub mode7_timing: bool,
    /// Samples in the readout window for pre-integrated data.
    /// Non-positive disables clipping corrections.
    pub window_samples: i32,
    /// Emulate the SSP crossing search (fixed 8-sample skip).
    pub ssp_emulation: bool,
    /// Prefer per-event running pedestals when present.
    pub use_running_pedestal: bool,
    /// Run the configured pulse fitter on Mode-1 waveforms.
    pub use_fit: bool,
}

impl Default for FadcConfig {
    fn default() -> Self {
        Self {
            window: IntegrationWindow::default(),
            threshold: 12.0,
            max_pulses: 3,
            mode7_timing: true,
            window_samples: -1,
            ssp_emulation: false,
            use_running_pedestal: false,
            use_fit: false,
        }
    }
}

// Intermediate structs for the JSON schema.
// Option names follow the DAQ configuration; the short snake_case keys
// are still read.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonConfig {
    fadc: JsonFadc,
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct JsonFadc {
    #[serde(rename = "NSA", alias = "nsa")]
    nsa: i32,
    #[serde(rename = "NSB", alias = "nsb")]
    nsb: i32,
    #[serde(rename = "integrationThreshold", alias = "threshold")]
    threshold: f64,
    #[serde(rename = "maxThresholdCrossings", alias = "max_pulses")]
    max_pulses: u32,
    #[serde(rename = "mode7Timing", alias = "mode7")]
    mode7: bool,
    #[serde(rename = "windowSamples", alias = "window_samples")]
    window_samples: i32,
    #[serde(rename = "sspEmulation", alias = "ssp_emulation")]
    ssp_emulation: bool,
    #[serde(rename = "runningPedestal", alias = "running_pedestal")]
    running_pedestal: bool,
    #[serde(rename = "useFit", alias = "use_fit")]
    use_fit: bool,
}

impl Default for JsonFadc {
    fn default() -> Self {
        let defaults = FadcConfig::default();
        Self {
            nsa: defaults.window.nsa,
            nsb: defaults.window.nsb,
            threshold: defaults.threshold,
            max_pulses: defaults.max_pulses,
            mode7: defaults.mode7_timing,
            window_samples: defaults.window_samples,
            ssp_emulation: defaults.ssp_emulation,
            running_pedestal: defaults.use_running_pedestal,
            use_fit: defaults.use_fit,
        }
    }
}

impl FadcConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the integration window lengths (ns).
    #[must_use]
    pub fn with_window(mut self, nsa: i32, nsb: i32) -> Self {
        self.window = IntegrationWindow { nsa, nsb };
        self
    }

    /// Set the leading-edge threshold (ADC above pedestal).
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the maximum number of pulses per waveform.
    #[must_use]
    pub fn with_max_pulses(mut self, max_pulses: u32) -> Self {
        self.max_pulses = max_pulses;
        self
    }

    /// Enable or disable Mode-7 timing.
    #[must_use]
    pub fn with_mode7_timing(mut self, mode7: bool) -> Self {
        self.mode7_timing = mode7;
        self
    }

    /// Set the readout window length in samples.
    #[must_use]
    pub fn with_window_samples(mut self, samples: i32) -> Self {
        self.window_samples = samples;
        self
    }

    /// Enable or disable SSP crossing-search emulation.
    #[must_use]
    pub fn with_ssp_emulation(mut self, ssp: bool) -> Self {
        self.ssp_emulation = ssp;
        self
    }

    /// Enable or disable running pedestals.
    #[must_use]
    pub fn with_running_pedestal(mut self, enabled: bool) -> Self {
        self.use_running_pedestal = enabled;
        self
    }

    /// Enable or disable pulse fitting.
    #[must_use]
    pub fn with_fit(mut self, enabled: bool) -> Self {
        self.use_fit = enabled;
        self
    }

    /// Readout window length, if clipping corrections are enabled.
    pub fn window_samples(&self) -> Option<usize> {
        usize::try_from(self.window_samples).ok().filter(|&n| n > 0)
    }

    /// Validate all parameters.
    ///
    /// Called when loading from JSON and when building an integrator.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.window.validate()?;
        if !(1..=3).contains(&self.max_pulses) {
            return Err(ConfigError::InvalidMaxPulses(self.max_pulses));
        }
        if !self.threshold.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "threshold".to_string(),
                value: self.threshold.to_string(),
            });
        }
        Ok(())
    }

    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let json_config: JsonConfig = serde_json::from_reader(reader)?;
        Self::from_json_config(json_config)
    }

    /// Load configuration from a JSON string.
    ///
    /// Fields missing from the document keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let json_config: JsonConfig = serde_json::from_str(json)?;
        Self::from_json_config(json_config)
    }

    fn from_json_config(config: JsonConfig) -> Result<Self> {
        let fadc = config.fadc;
        let config = Self {
            window: IntegrationWindow {
                nsa: fadc.nsa,
                nsb: fadc.nsb,
            },
            threshold: fadc.threshold,
            max_pulses: fadc.max_pulses,
            mode7_timing: fadc.mode7,
            window_samples: fadc.window_samples,
            ssp_emulation: fadc.ssp_emulation,
            use_running_pedestal: fadc.running_pedestal,
            use_fit: fadc.use_fit,
        };

        // Validate once at load time (not per-waveform)
        config.validate()?;
        log::info!("FADC configuration loaded: {config}");
        Ok(config)
    }
}

impl fmt::Display for FadcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NSA={} ns NSB={} ns threshold={} ADC max_pulses={} window_samples={} mode7={}",
            self.window.nsa,
            self.window.nsb,
            self.threshold,
            self.max_pulses,
            self.window_samples,
            self.mode7_timing
        )
    }
}
