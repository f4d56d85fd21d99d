//! Singles trigger.

use crate::config::TriggerCutConfig;
use crate::cuts::TriggerCuts;
use crate::trigger::{TriggerEvaluator, TriggerKind, TriggerObserver, TriggerRecord, TriggerState, TriggerStatistics};
use fadcsim_core::{ChannelTable, Cluster, ConfigError, Result};

/// Fires when any cluster of a cycle passes the cluster cuts.
pub struct SinglesTrigger {
    state: TriggerState,
}

impl SinglesTrigger {
    /// Creates a singles trigger, validating the cuts.
    pub fn new(config: TriggerCutConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: TriggerState::new(TriggerKind::Singles, config),
        })
    }

    /// The cuts in use.
    pub fn cuts(&self) -> &TriggerCuts {
        &self.state.cuts
    }

    /// Next cycle to be processed.
    pub fn cycle(&self) -> u64 {
        self.state.cycle
    }

    fn evaluate(&mut self, clusters: &[Cluster], table: &ChannelTable) -> Result<Option<TriggerRecord>> {
        if self.state.check_dead_time() {
            return Ok(None);
        }

        let passed = self.state.passing(clusters);
        for cluster in &passed {
            cluster.seed_index(table)?;
        }

        if passed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.state.fire()))
        }
    }
}

impl TriggerEvaluator for SinglesTrigger {
    fn name(&self) -> &'static str {
        "singles"
    }

    fn process_cycle(&mut self, clusters: &[Cluster], table: &ChannelTable) -> Result<Option<TriggerRecord>> {
        let result = self.evaluate(clusters, table);
        self.state.advance();
        result
    }

    fn statistics(&self) -> TriggerStatistics {
        self.state.statistics
    }

    fn add_observer(&mut self, observer: Box<dyn TriggerObserver>) {
        self.state.add_observer(observer);
    }
}
