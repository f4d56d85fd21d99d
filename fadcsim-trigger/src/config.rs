//! Trigger cut configuration.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::error::Result;
use crate::trigger::TriggerKind;
use fadcsim_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Named cut options.
pub mod names {
    /// Seed hit energy lower bound (GeV).
    pub const CLUSTER_SEED_ENERGY_LOW: &str = "clusterSeedEnergyLow";
    /// Seed hit energy upper bound (GeV).
    pub const CLUSTER_SEED_ENERGY_HIGH: &str = "clusterSeedEnergyHigh";
    /// Cluster energy lower bound (GeV).
    pub const CLUSTER_TOTAL_ENERGY_LOW: &str = "clusterTotalEnergyLow";
    /// Cluster energy upper bound (GeV).
    pub const CLUSTER_TOTAL_ENERGY_HIGH: &str = "clusterTotalEnergyHigh";
    /// Minimum hits in a cluster.
    pub const CLUSTER_HIT_COUNT_LOW: &str = "clusterHitCountLow";
    /// Pair energy sum lower bound (GeV).
    pub const PAIR_ENERGY_SUM_LOW: &str = "pairEnergySumLow";
    /// Pair energy sum upper bound (GeV).
    pub const PAIR_ENERGY_SUM_HIGH: &str = "pairEnergySumHigh";
    /// Pair energy difference upper bound (GeV).
    pub const PAIR_ENERGY_DIFFERENCE_HIGH: &str = "pairEnergyDifferenceHigh";
    /// Energy slope lower bound (GeV).
    pub const PAIR_ENERGY_SLOPE_LOW: &str = "pairEnergySlopeLow";
    /// Energy slope parameter F (GeV per crystal).
    pub const PAIR_ENERGY_SLOPE_F: &str = "pairEnergySlopeF";
    /// Coplanarity upper bound (degrees).
    pub const PAIR_COPLANARITY_HIGH: &str = "pairCoplanarityHigh";
    /// Pair time difference upper bound (ns).
    pub const PAIR_TIME_COINCIDENCE: &str = "pairTimeCoincidence";

    /// All recognized names.
    pub const ALL: [&str; 12] = [
        CLUSTER_SEED_ENERGY_LOW,
        CLUSTER_SEED_ENERGY_HIGH,
        CLUSTER_TOTAL_ENERGY_LOW,
        CLUSTER_TOTAL_ENERGY_HIGH,
        CLUSTER_HIT_COUNT_LOW,
        PAIR_ENERGY_SUM_LOW,
        PAIR_ENERGY_SUM_HIGH,
        PAIR_ENERGY_DIFFERENCE_HIGH,
        PAIR_ENERGY_SLOPE_LOW,
        PAIR_ENERGY_SLOPE_F,
        PAIR_COPLANARITY_HIGH,
        PAIR_TIME_COINCIDENCE,
    ];
}

/// Widest accepted pair coincidence half-window (cycles, about 4 us).
pub const MAX_PAIR_COINCIDENCE: usize = 1024;

/// Positional layout of a cut string.
const CUT_STRING_FIELDS: [&str; 10] = [
    names::CLUSTER_TOTAL_ENERGY_LOW,
    names::CLUSTER_TOTAL_ENERGY_HIGH,
    names::CLUSTER_HIT_COUNT_LOW,
    names::PAIR_ENERGY_SUM_LOW,
    names::PAIR_ENERGY_SUM_HIGH,
    names::PAIR_ENERGY_DIFFERENCE_HIGH,
    names::PAIR_ENERGY_SLOPE_LOW,
    names::PAIR_ENERGY_SLOPE_F,
    names::PAIR_COPLANARITY_HIGH,
    names::PAIR_TIME_COINCIDENCE,
];

const SINGLES_CUT_DEFAULTS: [f64; 3] = [0.0, 8.191, 0.0];

const PAIRS_CUT_DEFAULTS: [f64; 10] = [0.0, 8.191, 0.0, 0.0, 8.191, 8.191, 0.0, 0.0055, 180.0, f64::MAX];

/// Cut thresholds and timing for the trigger evaluators.
///
/// All energies in GeV, coplanarity in degrees, times in ns, and
/// `pair_coincidence` and `dead_time` in 4 ns clock cycles. The
/// defaults accept every cluster and every pair.
///
/// In JSON each cut is read under its option name, and also under its
/// [`names`] key. Unknown keys are rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct TriggerCutConfig {
    /// Seed hit energy lower bound.
    #[serde(alias = "clusterSeedEnergyLow")]
    pub seed_energy_low: f64,
    /// Seed hit energy upper bound.
    #[serde(alias = "clusterSeedEnergyHigh")]
    pub seed_energy_high: f64,
    /// Cluster energy lower bound.
    #[serde(alias = "clusterTotalEnergyLow")]
    pub total_energy_low: f64,
    /// Cluster energy upper bound.
    #[serde(alias = "clusterTotalEnergyHigh")]
    pub total_energy_high: f64,
    /// Minimum hits in a cluster.
    #[serde(alias = "clusterHitCountLow")]
    pub min_hit_count: u32,
    /// Pair energy sum lower bound.
    pub pair_energy_sum_low: f64,
    /// Pair energy sum upper bound.
    pub pair_energy_sum_high: f64,
    /// Pair energy difference upper bound.
    #[serde(alias = "pairEnergyDifferenceHigh")]
    pub pair_energy_diff_high: f64,
    /// Energy slope lower bound.
    #[serde(alias = "pairEnergySlopeLow")]
    pub energy_slope_low: f64,
    /// Energy slope parameter F, in GeV per unit of crystal-index distance.
    ///
    /// The 0.0055 default is the hardware value, which the SSP applies per
    /// mm of cluster separation. Over crystal indices it gives a looser
    /// cut than the hardware; scale it by the crystal pitch to match.
    #[serde(alias = "pairEnergySlopeF")]
    pub energy_slope_f: f64,
    /// Coplanarity upper bound.
    #[serde(alias = "pairCoplanarityHigh")]
    pub coplanarity_high: f64,
    /// Pair time difference upper bound.
    #[serde(alias = "pairTimeCoincidence")]
    pub time_coincidence: f64,
    /// Coincidence half-window (cycles).
    pub pair_coincidence: usize,
    /// Cycles suppressed after a trigger.
    pub dead_time: u64,
}

impl Default for TriggerCutConfig {
    fn default() -> Self {
        Self {
            seed_energy_low: 0.0,
            seed_energy_high: f64::MAX,
            total_energy_low: 0.0,
            total_energy_high: f64::MAX,
            min_hit_count: 0,
            pair_energy_sum_low: 0.0,
            pair_energy_sum_high: f64::MAX,
            pair_energy_diff_high: f64::MAX,
            energy_slope_low: 0.0,
            energy_slope_f: 0.0055,
            coplanarity_high: 180.0,
            time_coincidence: f64::MAX,
            pair_coincidence: 2,
            dead_time: 0,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonConfig {
    trigger: TriggerCutConfig,
}

impl TriggerCutConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the seed energy range.
    #[must_use]
    pub fn with_seed_energy(mut self, low: f64, high: f64) -> Self {
        self.seed_energy_low = low;
        self.seed_energy_high = high;
        self
    }

    /// Set the cluster energy range.
    #[must_use]
    pub fn with_total_energy(mut self, low: f64, high: f64) -> Self {
        self.total_energy_low = low;
        self.total_energy_high = high;
        self
    }

    /// Set the minimum hit count.
    #[must_use]
    pub fn with_min_hit_count(mut self, count: u32) -> Self {
        self.min_hit_count = count;
        self
    }

    /// Set the pair energy sum range.
    #[must_use]
    pub fn with_pair_energy_sum(mut self, low: f64, high: f64) -> Self {
        self.pair_energy_sum_low = low;
        self.pair_energy_sum_high = high;
        self
    }

    /// Set the pair energy difference bound.
    #[must_use]
    pub fn with_pair_energy_diff_high(mut self, high: f64) -> Self {
        self.pair_energy_diff_high = high;
        self
    }

    /// Set the energy slope bound and parameter.
    #[must_use]
    pub fn with_energy_slope(mut self, low: f64, f: f64) -> Self {
        self.energy_slope_low = low;
        self.energy_slope_f = f;
        self
    }

    /// Set the coplanarity bound.
    #[must_use]
    pub fn with_coplanarity_high(mut self, high: f64) -> Self {
        self.coplanarity_high = high;
        self
    }

    /// Set the pair time coincidence bound.
    #[must_use]
    pub fn with_time_coincidence(mut self, ns: f64) -> Self {
        self.time_coincidence = ns;
        self
    }

    /// Set the pair coincidence half-window.
    #[must_use]
    pub fn with_pair_coincidence(mut self, cycles: usize) -> Self {
        self.pair_coincidence = cycles;
        self
    }

    /// Set the dead time.
    #[must_use]
    pub fn with_dead_time(mut self, cycles: u64) -> Self {
        self.dead_time = cycles;
        self
    }

    /// Reject NaN thresholds and coincidence windows wider than
    /// [`MAX_PAIR_COINCIDENCE`].
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.pair_coincidence > MAX_PAIR_COINCIDENCE {
            return Err(ConfigError::InvalidValue {
                name: "pairCoincidence".to_string(),
                value: self.pair_coincidence.to_string(),
            });
        }
        for name in names::ALL {
            let value = self.cut_value(name)?;
            if value.is_nan() {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Current value of a named cut.
    pub fn cut_value(&self, name: &str) -> std::result::Result<f64, ConfigError> {
        Ok(match name {
            names::CLUSTER_SEED_ENERGY_LOW => self.seed_energy_low,
            names::CLUSTER_SEED_ENERGY_HIGH => self.seed_energy_high,
            names::CLUSTER_TOTAL_ENERGY_LOW => self.total_energy_low,
            names::CLUSTER_TOTAL_ENERGY_HIGH => self.total_energy_high,
            names::CLUSTER_HIT_COUNT_LOW => f64::from(self.min_hit_count),
            names::PAIR_ENERGY_SUM_LOW => self.pair_energy_sum_low,
            names::PAIR_ENERGY_SUM_HIGH => self.pair_energy_sum_high,
            names::PAIR_ENERGY_DIFFERENCE_HIGH => self.pair_energy_diff_high,
            names::PAIR_ENERGY_SLOPE_LOW => self.energy_slope_low,
            names::PAIR_ENERGY_SLOPE_F => self.energy_slope_f,
            names::PAIR_COPLANARITY_HIGH => self.coplanarity_high,
            names::PAIR_TIME_COINCIDENCE => self.time_coincidence,
            _ => return Err(ConfigError::UnknownCut(name.to_string())),
        })
    }

    /// Set a named cut.
    pub fn set_cut_value(&mut self, name: &str, value: f64) -> std::result::Result<(), ConfigError> {
        let slot = match name {
            names::CLUSTER_HIT_COUNT_LOW => {
                if !value.is_finite() || value < 0.0 || value > f64::from(u32::MAX) {
                    return Err(ConfigError::InvalidValue {
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                self.min_hit_count = value.ceil() as u32;
                return Ok(());
            }
            names::CLUSTER_SEED_ENERGY_LOW => &mut self.seed_energy_low,
            names::CLUSTER_SEED_ENERGY_HIGH => &mut self.seed_energy_high,
            names::CLUSTER_TOTAL_ENERGY_LOW => &mut self.total_energy_low,
            names::CLUSTER_TOTAL_ENERGY_HIGH => &mut self.total_energy_high,
            names::PAIR_ENERGY_SUM_LOW => &mut self.pair_energy_sum_low,
            names::PAIR_ENERGY_SUM_HIGH => &mut self.pair_energy_sum_high,
            names::PAIR_ENERGY_DIFFERENCE_HIGH => &mut self.pair_energy_diff_high,
            names::PAIR_ENERGY_SLOPE_LOW => &mut self.energy_slope_low,
            names::PAIR_ENERGY_SLOPE_F => &mut self.energy_slope_f,
            names::PAIR_COPLANARITY_HIGH => &mut self.coplanarity_high,
            names::PAIR_TIME_COINCIDENCE => &mut self.time_coincidence,
            _ => return Err(ConfigError::UnknownCut(name.to_string())),
        };
        *slot = value;
        Ok(())
    }

    /// Set cuts from a positional, whitespace separated string.
    ///
    /// Singles strings hold `Emin Emax Nmin`; pair strings continue with
    /// `sumMin sumMax diffMax slopeMin slopeF coplanarityMax timeCoincidence`.
    /// Missing trailing values take the hardware defaults and extra
    /// tokens are ignored.
    pub fn parse_cut_values(&mut self, kind: TriggerKind, cut_values: &str) -> std::result::Result<(), ConfigError> {
        let mut cuts = match kind {
            TriggerKind::Singles => SINGLES_CUT_DEFAULTS.to_vec(),
            TriggerKind::Pairs => PAIRS_CUT_DEFAULTS.to_vec(),
        };

        for ((slot, name), token) in cuts
            .iter_mut()
            .zip(CUT_STRING_FIELDS)
            .zip(cut_values.split_whitespace())
        {
            *slot = token.parse().map_err(|_| ConfigError::MalformedCutValue {
                name,
                token: token.to_string(),
            })?;
        }

        for (name, value) in CUT_STRING_FIELDS.iter().zip(cuts) {
            self.set_cut_value(name, value)?;
        }
        Ok(())
    }

    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let json_config: JsonConfig = serde_json::from_reader(reader)?;
        json_config.trigger.validated()
    }

    /// Load configuration from a JSON string.
    ///
    /// Fields missing from the document keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let json_config: JsonConfig = serde_json::from_str(json)?;
        json_config.trigger.validated()
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        log::info!(
            "trigger cuts loaded: pair coincidence {} cycles, dead time {} cycles",
            self.pair_coincidence,
            self.dead_time
        );
        Ok(self)
    }
}
