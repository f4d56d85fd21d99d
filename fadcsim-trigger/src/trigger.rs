//! Trigger evaluation: shared state, records and observers.

use crate::config::TriggerCutConfig;
use crate::cuts::TriggerCuts;
use fadcsim_core::{ChannelTable, Cluster, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clock period of the trigger logic (ns per cycle).
pub const CYCLE_NS: f64 = 4.0;

/// Trigger type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// One cluster passing the cluster cuts.
    Singles,
    /// Two coincident clusters passing the pair cuts.
    Pairs,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Singles => write!(f, "singles"),
            TriggerKind::Pairs => write!(f, "pairs"),
        }
    }
}

/// A fired trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TriggerRecord {
    /// Clock cycle of the decision.
    pub cycle: u64,
    /// Cycle time (ns).
    pub time_ns: f64,
    /// Trigger type that fired.
    pub kind: TriggerKind,
}

impl TriggerRecord {
    /// Record for a trigger at `cycle`.
    pub fn new(cycle: u64, kind: TriggerKind) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let time_ns = cycle as f64 * CYCLE_NS;
        Self {
            cycle,
            time_ns,
            kind,
        }
    }
}

/// Receives every trigger an evaluator fires.
pub trait TriggerObserver: Send {
    /// Called once per fired trigger.
    fn trigger_fired(&mut self, record: &TriggerRecord);
}

/// Cycles suppressed after a trigger.
///
/// A trigger at cycle `N` blocks cycles `N + 1` through `N + length`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadTime {
    length: u64,
    last_trigger: Option<u64>,
}

impl DeadTime {
    /// Dead time of `length` cycles.
    pub fn new(length: u64) -> Self {
        Self {
            length,
            last_trigger: None,
        }
    }

    /// Length in cycles.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Whether `cycle` falls inside the window opened by the last trigger.
    pub fn is_dead(&self, cycle: u64) -> bool {
        self.last_trigger
            .is_some_and(|trigger| cycle > trigger && cycle - trigger <= self.length)
    }

    /// Opens a window at `cycle`.
    pub fn start(&mut self, cycle: u64) {
        self.last_trigger = Some(cycle);
    }

    /// Forgets the last trigger.
    pub fn clear(&mut self) {
        self.last_trigger = None;
    }
}

/// Trigger statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TriggerStatistics {
    /// Cycles handed to the evaluator.
    pub cycles_processed: u64,
    /// Cycles skipped for dead time.
    pub cycles_in_dead_time: u64,
    /// Clusters evaluated against the cluster cuts.
    pub clusters_seen: u64,
    /// Clusters passing the cluster cuts.
    pub clusters_passed: u64,
    /// Cluster pairs tested.
    pub pairs_tested: u64,
    /// Triggers fired.
    pub triggers: u64,
}

/// A trigger evaluator driven one clock cycle at a time.
pub trait TriggerEvaluator: Send {
    /// Name of the trigger type.
    fn name(&self) -> &'static str;

    /// Processes the clusters of one cycle.
    ///
    /// Cycles must be handed over in order, one call per cycle, empty
    /// cycles included. Returns the record if a trigger fired.
    fn process_cycle(&mut self, clusters: &[Cluster], table: &ChannelTable) -> Result<Option<TriggerRecord>>;

    /// Returns current statistics.
    fn statistics(&self) -> TriggerStatistics;

    /// Registers an observer.
    fn add_observer(&mut self, observer: Box<dyn TriggerObserver>);
}

/// State shared by the trigger evaluators.
pub(crate) struct TriggerState {
    pub(crate) kind: TriggerKind,
    pub(crate) cuts: TriggerCuts,
    pub(crate) dead_time: DeadTime,
    pub(crate) cycle: u64,
    pub(crate) statistics: TriggerStatistics,
    observers: Vec<Box<dyn TriggerObserver>>,
}

impl TriggerState {
    pub(crate) fn new(kind: TriggerKind, config: TriggerCutConfig) -> Self {
        Self {
            kind,
            dead_time: DeadTime::new(config.dead_time),
            cuts: TriggerCuts::new(config),
            cycle: 0,
            statistics: TriggerStatistics::default(),
            observers: Vec::new(),
        }
    }

    pub(crate) fn add_observer(&mut self, observer: Box<dyn TriggerObserver>) {
        self.observers.push(observer);
    }

    /// Whether the current cycle is dead; counts it if so.
    pub(crate) fn check_dead_time(&mut self) -> bool {
        let dead = self.dead_time.is_dead(self.cycle);
        if dead {
            self.statistics.cycles_in_dead_time += 1;
        }
        dead
    }

    /// Clusters passing the cluster cuts, in input order.
    pub(crate) fn passing<'c>(&mut self, clusters: &'c [Cluster]) -> Vec<&'c Cluster> {
        let passed: Vec<&Cluster> = clusters
            .iter()
            .filter(|cluster| self.cuts.passes_singles(cluster))
            .collect();
        self.statistics.clusters_seen += clusters.len() as u64;
        self.statistics.clusters_passed += passed.len() as u64;
        passed
    }

    /// Fires a trigger for the current cycle.
    pub(crate) fn fire(&mut self) -> TriggerRecord {
        let record = TriggerRecord::new(self.cycle, self.kind);
        self.dead_time.start(self.cycle);
        self.statistics.triggers += 1;
        log::debug!("{} trigger at cycle {} ({} ns)", record.kind, record.cycle, record.time_ns);
        for observer in &mut self.observers {
            observer.trigger_fired(&record);
        }
        record
    }

    /// Moves to the next cycle.
    pub(crate) fn advance(&mut self) {
        self.statistics.cycles_processed += 1;
        self.cycle += 1;
    }
}

/// Several evaluators fed the same cycles.
#[derive(Default)]
pub struct TriggerBank {
    evaluators: Vec<Box<dyn TriggerEvaluator>>,
}

impl TriggerBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an evaluator.
    pub fn push(&mut self, evaluator: Box<dyn TriggerEvaluator>) {
        self.evaluators.push(evaluator);
    }

    /// Number of evaluators.
    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    /// Whether the bank has no evaluators.
    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }

    /// Feeds one cycle to every evaluator and collects the triggers that fired.
    pub fn process_cycle(&mut self, clusters: &[Cluster], table: &ChannelTable) -> Result<Vec<TriggerRecord>> {
        let mut fired = Vec::new();
        for evaluator in &mut self.evaluators {
            if let Some(record) = evaluator.process_cycle(clusters, table)? {
                fired.push(record);
            }
        }
        Ok(fired)
    }

    /// Statistics per evaluator, by name.
    pub fn statistics(&self) -> Vec<(&'static str, TriggerStatistics)> {
        self.evaluators
            .iter()
            .map(|evaluator| (evaluator.name(), evaluator.statistics()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dead_time_window() {
        let mut dead_time = DeadTime::new(4);
        assert!(!dead_time.is_dead(0));

        dead_time.start(10);
        assert!(!dead_time.is_dead(10));
        for cycle in 11..=14 {
            assert!(dead_time.is_dead(cycle), "cycle {cycle}");
        }
        assert!(!dead_time.is_dead(15));

        dead_time.clear();
        assert!(!dead_time.is_dead(11));
    }

    #[test]
    fn test_zero_dead_time() {
        let mut dead_time = DeadTime::new(0);
        dead_time.start(3);
        assert!(!dead_time.is_dead(4));
    }

    #[test]
    fn test_record_time() {
        let record = TriggerRecord::new(25, TriggerKind::Pairs);
        assert_relative_eq!(record.time_ns, 100.0);
        assert_eq!(record.kind.to_string(), "pairs");
    }
}
