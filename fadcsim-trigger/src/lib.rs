//! fadcsim-trigger: SSP-style singles and pair triggers.
//!
//! Clusters arrive once per 4 ns clock cycle. Each evaluator applies its
//! cuts, keeps whatever cross-cycle state it needs and reports the
//! cycles on which it fires.
//!
//! # Key Components
//!
//! - [`TriggerCutConfig`] - Cut thresholds, coincidence window and dead time
//! - [`TriggerCuts`] - Individual cluster and pair cuts
//! - [`SinglesTrigger`] - Any cluster passing the cluster cuts
//! - [`PairTrigger`] - Top/bottom pairs within the coincidence window
//! - [`TriggerBank`] - Several evaluators over the same cycles
#![warn(missing_docs)]

mod config;
mod cuts;
mod error;
mod pairs;
mod singles;
mod trigger;

pub use config::{names, TriggerCutConfig, MAX_PAIR_COINCIDENCE};
pub use cuts::{ClusterPair, IndexedCluster, TriggerCuts};
pub use error::{Error, Result};
pub use pairs::PairTrigger;
pub use singles::SinglesTrigger;
pub use trigger::{
    DeadTime, TriggerBank, TriggerEvaluator, TriggerKind, TriggerObserver, TriggerRecord,
    TriggerStatistics, CYCLE_NS,
};

/// Builds the evaluator for a trigger type.
pub fn evaluator(
    kind: TriggerKind,
    config: TriggerCutConfig,
) -> std::result::Result<Box<dyn TriggerEvaluator>, fadcsim_core::ConfigError> {
    Ok(match kind {
        TriggerKind::Singles => Box::new(SinglesTrigger::new(config)?),
        TriggerKind::Pairs => Box::new(PairTrigger::new(config)?),
    })
}
