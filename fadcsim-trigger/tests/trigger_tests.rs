//! Multi-cycle trigger scenarios.

use fadcsim_core::{reload, CalibratedHit, ChannelId, ChannelRecord, ChannelTable, Cluster};
use fadcsim_trigger::{
    evaluator, PairTrigger, TriggerBank, TriggerCutConfig, TriggerEvaluator, TriggerKind,
    TriggerObserver, TriggerRecord,
};
use std::sync::{Arc, Mutex};

const TOP: u64 = 10;
const BOTTOM: u64 = 20;

fn table() -> ChannelTable {
    reload(&[
        ChannelRecord::new(ChannelId(TOP), 8, 2, 0.15, 100.0, 0.0),
        ChannelRecord::new(ChannelId(BOTTOM), -8, -2, 0.15, 100.0, 0.0),
    ])
    .unwrap()
}

fn cluster(channel: u64, energy: f64) -> Cluster {
    Cluster::new(vec![CalibratedHit::new(ChannelId(channel), energy, 20.0)]).unwrap()
}

/// Feeds `cycles` cycles, placing clusters on the listed cycles.
fn run(evaluator: &mut dyn TriggerEvaluator, cycles: u64, placed: &[(u64, Cluster)]) -> Vec<u64> {
    let table = table();
    let mut fired = Vec::new();
    for cycle in 0..cycles {
        let clusters: Vec<Cluster> = placed
            .iter()
            .filter(|(at, _)| *at == cycle)
            .map(|(_, cluster)| cluster.clone())
            .collect();
        if let Some(record) = evaluator.process_cycle(&clusters, &table).unwrap() {
            fired.push(record.cycle);
        }
    }
    fired
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<TriggerRecord>>>);

impl TriggerObserver for Recorder {
    fn trigger_fired(&mut self, record: &TriggerRecord) {
        self.0.lock().unwrap().push(*record);
    }
}

#[test]
fn test_pair_within_coincidence_window() {
    for offset in 0..=2u64 {
        let mut trigger = PairTrigger::new(TriggerCutConfig::new().with_pair_coincidence(2)).unwrap();
        // bottom first, top later
        let fired = run(
            &mut trigger,
            10,
            &[(3, cluster(BOTTOM, 1.0)), (3 + offset, cluster(TOP, 1.0))],
        );
        assert_eq!(fired, vec![5], "top {offset} cycles after bottom");

        let mut trigger = PairTrigger::new(TriggerCutConfig::new().with_pair_coincidence(2)).unwrap();
        // top first, bottom later
        let fired = run(
            &mut trigger,
            10,
            &[(3, cluster(TOP, 1.0)), (3 + offset, cluster(BOTTOM, 1.0))],
        );
        assert_eq!(fired, vec![5 + offset], "bottom {offset} cycles after top");
    }
}

#[test]
fn test_pair_outside_coincidence_window() {
    let mut trigger = PairTrigger::new(TriggerCutConfig::new().with_pair_coincidence(2)).unwrap();
    let fired = run(
        &mut trigger,
        12,
        &[(3, cluster(BOTTOM, 1.0)), (6, cluster(TOP, 1.0))],
    );
    assert!(fired.is_empty());

    let mut trigger = PairTrigger::new(TriggerCutConfig::new().with_pair_coincidence(2)).unwrap();
    let fired = run(
        &mut trigger,
        12,
        &[(6, cluster(BOTTOM, 1.0)), (3, cluster(TOP, 1.0))],
    );
    assert!(fired.is_empty());
}

#[test]
fn test_dead_time_suppresses_evaluation() {
    let config = TriggerCutConfig::new().with_dead_time(4);
    let mut trigger = evaluator(TriggerKind::Singles, config).unwrap();
    let placed: Vec<(u64, Cluster)> = (0..8).map(|cycle| (cycle, cluster(TOP, 1.0))).collect();

    let fired = run(trigger.as_mut(), 8, &placed);
    assert_eq!(fired, vec![0, 5]);

    let stats = trigger.statistics();
    assert_eq!(stats.cycles_processed, 8);
    assert_eq!(stats.cycles_in_dead_time, 6);
    assert_eq!(stats.clusters_seen, 2);
}

#[test]
fn test_pair_dead_time() {
    let config = TriggerCutConfig::new().with_pair_coincidence(0).with_dead_time(4);
    let mut trigger = PairTrigger::new(config).unwrap();
    let placed: Vec<(u64, Cluster)> = (0..6)
        .flat_map(|cycle| [(cycle, cluster(TOP, 1.0)), (cycle, cluster(BOTTOM, 1.0))])
        .collect();

    assert_eq!(run(&mut trigger, 6, &placed), vec![0, 5]);
    assert_eq!(trigger.statistics().pairs_tested, 2);
}

#[test]
fn test_bank_and_observers() {
    let recorder = Recorder::default();
    let mut bank = TriggerBank::new();
    for kind in [TriggerKind::Singles, TriggerKind::Pairs] {
        let mut trigger = evaluator(kind, TriggerCutConfig::new().with_pair_coincidence(0)).unwrap();
        trigger.add_observer(Box::new(recorder.clone()));
        bank.push(trigger);
    }
    assert_eq!(bank.len(), 2);

    let table = table();
    assert!(bank.process_cycle(&[], &table).unwrap().is_empty());
    let fired = bank
        .process_cycle(&[cluster(TOP, 1.0), cluster(BOTTOM, 0.9)], &table)
        .unwrap();
    let kinds: Vec<TriggerKind> = fired.iter().map(|record| record.kind).collect();
    assert_eq!(kinds, vec![TriggerKind::Singles, TriggerKind::Pairs]);

    let seen = recorder.0.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|record| record.cycle == 1));

    let names: Vec<&str> = bank.statistics().iter().map(|(name, _)| *name).collect();
    assert_eq!(names, vec!["singles", "pairs"]);
}
