//! Pair trigger with top/bottom coincidence queues.

use crate::config::TriggerCutConfig;
use crate::cuts::{ClusterPair, IndexedCluster, TriggerCuts};
use crate::trigger::{TriggerEvaluator, TriggerKind, TriggerObserver, TriggerRecord, TriggerState, TriggerStatistics};
use fadcsim_core::{ChannelTable, Cluster, ConfigError, Result};
use std::collections::VecDeque;

/// Fires when a top and a bottom cluster within the coincidence window
/// pass the pair cuts.
///
/// The top queue spans `2c + 1` cycles and the bottom queue `c + 1`,
/// where `c` is the pair coincidence. The oldest bottom cycle sits at the
/// centre of the top queue, so it is paired with top clusters from `c`
/// cycles before to `c` cycles after it.
pub struct PairTrigger {
    state: TriggerState,
    top: VecDeque<Vec<IndexedCluster>>,
    bottom: VecDeque<Vec<IndexedCluster>>,
}

impl PairTrigger {
    /// Creates a pair trigger with empty queues, validating the cuts.
    pub fn new(config: TriggerCutConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let coincidence = config.pair_coincidence;
        let top = std::iter::repeat_with(Vec::new).take(2 * coincidence + 1).collect();
        let bottom = std::iter::repeat_with(Vec::new).take(coincidence + 1).collect();
        Ok(Self {
            state: TriggerState::new(TriggerKind::Pairs, config),
            top,
            bottom,
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

    /// Queue depths, top then bottom.
    pub fn queue_depths(&self) -> (usize, usize) {
        (self.top.len(), self.bottom.len())
    }

    /// Push the cycle's clusters and drop the oldest.
    fn shift(&mut self, top: Vec<IndexedCluster>, bottom: Vec<IndexedCluster>) {
        self.top.push_back(top);
        self.top.pop_front();
        self.bottom.push_back(bottom);
        self.bottom.pop_front();
    }

    fn evaluate(&mut self, clusters: &[Cluster], table: &ChannelTable) -> Result<Option<TriggerRecord>> {
        if self.state.check_dead_time() {
            self.shift(Vec::new(), Vec::new());
            return Ok(None);
        }

        let mut top = Vec::new();
        let mut bottom = Vec::new();
        for cluster in self.state.passing(clusters) {
            let indexed = IndexedCluster::new(cluster.clone(), table)?;
            if indexed.is_top() {
                top.push(indexed);
            } else {
                bottom.push(indexed);
            }
        }
        self.shift(top, bottom);

        if self.find_pair() {
            Ok(Some(self.state.fire()))
        } else {
            Ok(None)
        }
    }

    /// Tests the oldest bottom cycle against every top cycle.
    fn find_pair(&mut self) -> bool {
        let Some(bottom) = self.bottom.front() else {
            return false;
        };
        let cuts = &self.state.cuts;
        let statistics = &mut self.state.statistics;

        for bottom_cluster in bottom {
            for top_cluster in self.top.iter().flatten() {
                statistics.pairs_tested += 1;
                // bottom leads on equal energies
                let pair = ClusterPair::ordered(bottom_cluster, top_cluster);
                if cuts.passes_pair(&pair) {
                    return true;
                }
            }
        }
        false
    }
}

impl TriggerEvaluator for PairTrigger {
    fn name(&self) -> &'static str {
        "pairs"
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
