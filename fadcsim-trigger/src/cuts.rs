//! Cluster and cluster-pair cuts.

use crate::config::TriggerCutConfig;
use fadcsim_core::{ChannelTable, Cluster, CrystalIndex, Result};

/// Cluster with its seed crystal resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedCluster {
    cluster: Cluster,
    seed_index: CrystalIndex,
}

impl IndexedCluster {
    /// Resolves the seed crystal. An unmapped seed channel is a geometry error.
    pub fn new(cluster: Cluster, table: &ChannelTable) -> Result<Self> {
        let seed_index = cluster.seed_index(table)?;
        Ok(Self {
            cluster,
            seed_index,
        })
    }

    /// The cluster.
    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    /// Seed crystal.
    pub fn seed_index(&self) -> CrystalIndex {
        self.seed_index
    }

    /// Cluster energy (GeV).
    pub fn energy(&self) -> f64 {
        self.cluster.total_energy()
    }

    /// Whether the seed sits in the top half.
    pub fn is_top(&self) -> bool {
        self.seed_index.is_top()
    }
}

/// Two clusters ordered by energy, higher first.
#[derive(Debug, Clone, Copy)]
pub struct ClusterPair<'a> {
    high: &'a IndexedCluster,
    low: &'a IndexedCluster,
}

impl<'a> ClusterPair<'a> {
    /// Orders the pair. Ties keep `first` in front; every pair cut is
    /// symmetric, so the tie order only shows in [`high`](Self::high) and
    /// [`low`](Self::low).
    pub fn ordered(first: &'a IndexedCluster, second: &'a IndexedCluster) -> Self {
        if second.energy() > first.energy() {
            Self {
                high: second,
                low: first,
            }
        } else {
            Self {
                high: first,
                low: second,
            }
        }
    }

    /// Higher-energy cluster.
    pub fn high(&self) -> &'a IndexedCluster {
        self.high
    }

    /// Lower-energy cluster.
    pub fn low(&self) -> &'a IndexedCluster {
        self.low
    }

    /// E1 + E2.
    pub fn energy_sum(&self) -> f64 {
        self.high.energy() + self.low.energy()
    }

    /// |E1 - E2|.
    pub fn energy_difference(&self) -> f64 {
        (self.high.energy() - self.low.energy()).abs()
    }

    /// Crystal-index distance between the seeds.
    pub fn seed_distance(&self) -> f64 {
        self.high.seed_index().distance(&self.low.seed_index())
    }

    /// Energy slope `min(E1, E2) - F * distance` (GeV).
    pub fn energy_slope(&self, slope_f: f64) -> f64 {
        self.high.energy().min(self.low.energy()) - self.seed_distance() * slope_f
    }

    /// Deviation from back-to-back in azimuth (degrees, 0 to 180).
    pub fn coplanarity(&self) -> f64 {
        let mut delta = (self.high.seed_index().azimuth_degrees() - self.low.seed_index().azimuth_degrees()).abs();
        if delta > 180.0 {
            delta = 360.0 - delta;
        }
        180.0 - delta
    }

    /// |t1 - t2| (ns).
    pub fn time_difference(&self) -> f64 {
        (self.high.cluster().time() - self.low.cluster().time()).abs()
    }
}

/// Evaluates the configured cuts. Bounds are inclusive.
#[derive(Debug, Clone)]
pub struct TriggerCuts {
    config: TriggerCutConfig,
}

impl TriggerCuts {
    /// Creates an evaluator over a cut configuration.
    pub fn new(config: TriggerCutConfig) -> Self {
        Self { config }
    }

    /// The configuration.
    pub fn config(&self) -> &TriggerCutConfig {
        &self.config
    }

    /// Seed hit energy within range.
    pub fn seed_energy(&self, cluster: &Cluster) -> bool {
        let energy = cluster.seed_energy();
        energy >= self.config.seed_energy_low && energy <= self.config.seed_energy_high
    }

    /// Hit count at or above the minimum.
    pub fn hit_count(&self, cluster: &Cluster) -> bool {
        cluster.hit_count() >= self.config.min_hit_count as usize
    }

    /// Cluster energy within range.
    pub fn total_energy(&self, cluster: &Cluster) -> bool {
        let energy = cluster.total_energy();
        energy >= self.config.total_energy_low && energy <= self.config.total_energy_high
    }

    /// Seed energy, then hit count, then total energy.
    pub fn passes_singles(&self, cluster: &Cluster) -> bool {
        self.seed_energy(cluster) && self.hit_count(cluster) && self.total_energy(cluster)
    }

    /// Energy sum within range.
    pub fn pair_energy_sum(&self, pair: &ClusterPair<'_>) -> bool {
        let sum = pair.energy_sum();
        sum >= self.config.pair_energy_sum_low && sum <= self.config.pair_energy_sum_high
    }

    /// Energy difference at or below the maximum.
    pub fn pair_energy_difference(&self, pair: &ClusterPair<'_>) -> bool {
        pair.energy_difference() <= self.config.pair_energy_diff_high
    }

    /// Energy slope at or above the minimum.
    pub fn pair_energy_slope(&self, pair: &ClusterPair<'_>) -> bool {
        pair.energy_slope(self.config.energy_slope_f) >= self.config.energy_slope_low
    }

    /// Coplanarity at or below the maximum.
    pub fn pair_coplanarity(&self, pair: &ClusterPair<'_>) -> bool {
        pair.coplanarity() <= self.config.coplanarity_high
    }

    /// Time difference at or below the maximum.
    pub fn pair_time_coincidence(&self, pair: &ClusterPair<'_>) -> bool {
        pair.time_difference() <= self.config.time_coincidence
    }

    /// All pair cuts in order. Both clusters must already pass the singles cuts.
    pub fn passes_pair(&self, pair: &ClusterPair<'_>) -> bool {
        self.pair_energy_sum(pair)
            && self.pair_energy_difference(pair)
            && self.pair_energy_slope(pair)
            && self.pair_coplanarity(pair)
            && self.pair_time_coincidence(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fadcsim_core::{reload, CalibratedHit, ChannelId, ChannelRecord};

    fn table() -> ChannelTable {
        reload(&[
            ChannelRecord::new(ChannelId(1), 5, 1, 0.15, 100.0, 0.0),
            ChannelRecord::new(ChannelId(2), -5, -1, 0.15, 100.0, 0.0),
            ChannelRecord::new(ChannelId(3), 5, -1, 0.15, 100.0, 0.0),
            ChannelRecord::new(ChannelId(4), 1, 1, 0.15, 100.0, 0.0),
        ])
        .unwrap()
    }

    fn cluster(hits: &[(u64, f64)]) -> Cluster {
        Cluster::new(
            hits.iter()
                .map(|&(channel, energy)| CalibratedHit::new(ChannelId(channel), energy, 20.0))
                .collect(),
        )
        .unwrap()
    }

    fn indexed(channel: u64, energy: f64, time: f64) -> IndexedCluster {
        let cluster = Cluster::new(vec![CalibratedHit::new(ChannelId(channel), energy, time)]).unwrap();
        IndexedCluster::new(cluster, &table()).unwrap()
    }

    fn rejecting_config() -> TriggerCutConfig {
        TriggerCutConfig::new()
            .with_seed_energy(0.05, f64::MAX)
            .with_total_energy(0.1, f64::MAX)
            .with_min_hit_count(2)
    }

    #[test]
    fn test_low_seed_rejected() {
        let cuts = TriggerCuts::new(rejecting_config());
        // total and hit count pass; seed does not
        let candidate = cluster(&[(1, 0.03), (4, 0.2)]);
        assert!(!cuts.seed_energy(&candidate));
        assert!(cuts.hit_count(&candidate));
        assert!(cuts.total_energy(&candidate));
        assert!(!cuts.passes_singles(&candidate));
    }

    #[test]
    fn test_hit_count_cut_alone() {
        let cuts = TriggerCuts::new(rejecting_config());
        let candidate = cluster(&[(1, 0.3)]);
        assert!(cuts.seed_energy(&candidate));
        assert!(!cuts.hit_count(&candidate));
        assert!(cuts.total_energy(&candidate));
        assert!(!cuts.passes_singles(&candidate));
    }

    #[test]
    fn test_total_energy_cut_alone() {
        let cuts = TriggerCuts::new(rejecting_config());
        let candidate = cluster(&[(1, 0.06), (4, 0.02)]);
        assert!(cuts.seed_energy(&candidate));
        assert!(cuts.hit_count(&candidate));
        assert!(!cuts.total_energy(&candidate));
        assert!(!cuts.passes_singles(&candidate));
    }

    #[test]
    fn test_bounds_inclusive() {
        let cuts = TriggerCuts::new(TriggerCutConfig::new().with_total_energy(0.5, 1.0));
        assert!(cuts.total_energy(&cluster(&[(1, 0.5)])));
        assert!(cuts.total_energy(&cluster(&[(1, 1.0)])));
        assert!(!cuts.total_energy(&cluster(&[(1, 1.01)])));
    }

    #[test]
    fn test_energy_difference() {
        let cuts = TriggerCuts::new(TriggerCutConfig::new().with_pair_energy_diff_high(0.05));

        let a = indexed(1, 1.0, 20.0);
        let b = indexed(2, 1.0, 20.0);
        assert!(cuts.pair_energy_difference(&ClusterPair::ordered(&a, &b)));

        let c = indexed(2, 0.5, 20.0);
        assert!(!cuts.pair_energy_difference(&ClusterPair::ordered(&a, &c)));
    }

    #[test]
    fn test_pair_ordering() {
        let low = indexed(1, 0.4, 20.0);
        let high = indexed(2, 0.9, 20.0);
        let pair = ClusterPair::ordered(&low, &high);
        assert_relative_eq!(pair.high().energy(), 0.9);
        assert_relative_eq!(pair.low().energy(), 0.4);
        assert_relative_eq!(pair.energy_sum(), 1.3);
    }

    #[test]
    fn test_pair_tie_keeps_first() {
        let bottom = indexed(2, 0.7, 20.0);
        let top = indexed(1, 0.7, 24.0);
        let pair = ClusterPair::ordered(&bottom, &top);
        assert_eq!(pair.high(), &bottom);
        assert_eq!(pair.low(), &top);

        let swapped = ClusterPair::ordered(&top, &bottom);
        let cuts = TriggerCuts::new(TriggerCutConfig::new().with_energy_slope(0.5, 0.01));
        assert_eq!(cuts.passes_pair(&pair), cuts.passes_pair(&swapped));
        assert_relative_eq!(pair.coplanarity(), swapped.coplanarity());
        assert_relative_eq!(pair.energy_slope(0.01), swapped.energy_slope(0.01));
    }

    #[test]
    fn test_coplanarity() {
        // (5, 1) and (-5, -1) are back to back
        let a = indexed(1, 1.0, 20.0);
        let b = indexed(2, 1.0, 20.0);
        assert_relative_eq!(ClusterPair::ordered(&a, &b).coplanarity(), 0.0, epsilon = 1e-9);

        // (5, 1) and (5, -1) are mirror images across the beam plane
        let c = indexed(3, 1.0, 20.0);
        let expected = 180.0 - 2.0 * 1.0_f64.atan2(5.0).to_degrees();
        let pair = ClusterPair::ordered(&a, &c);
        assert_relative_eq!(pair.coplanarity(), expected, epsilon = 1e-9);

        let cuts = TriggerCuts::new(TriggerCutConfig::new().with_coplanarity_high(30.0));
        assert!(!cuts.pair_coplanarity(&pair));
        assert!(cuts.pair_coplanarity(&ClusterPair::ordered(&a, &b)));
    }

    #[test]
    fn test_energy_slope() {
        let a = indexed(1, 1.0, 20.0);
        let b = indexed(3, 0.5, 20.0);
        let pair = ClusterPair::ordered(&a, &b);
        assert_relative_eq!(pair.seed_distance(), 2.0);
        assert_relative_eq!(pair.energy_slope(0.1), 0.3);

        let cuts = TriggerCuts::new(TriggerCutConfig::new().with_energy_slope(0.3, 0.1));
        assert!(cuts.pair_energy_slope(&pair));
        let cuts = TriggerCuts::new(TriggerCutConfig::new().with_energy_slope(0.31, 0.1));
        assert!(!cuts.pair_energy_slope(&pair));
    }

    #[test]
    fn test_time_coincidence() {
        let a = indexed(1, 1.0, 20.0);
        let b = indexed(2, 1.0, 28.0);
        let pair = ClusterPair::ordered(&a, &b);
        let cuts = TriggerCuts::new(TriggerCutConfig::new().with_time_coincidence(8.0));
        assert!(cuts.pair_time_coincidence(&pair));
        let cuts = TriggerCuts::new(TriggerCutConfig::new().with_time_coincidence(4.0));
        assert!(!cuts.pair_time_coincidence(&pair));
        assert!(!cuts.passes_pair(&pair));
    }

    #[test]
    fn test_defaults_accept_everything() {
        let cuts = TriggerCuts::new(TriggerCutConfig::default());
        assert!(cuts.passes_singles(&cluster(&[(1, 0.0)])));
        let a = indexed(1, 3.0, 20.0);
        let b = indexed(3, 0.01, 400.0);
        let pair = ClusterPair::ordered(&a, &b);
        // the default slope F still applies, so only check the other cuts
        assert!(cuts.pair_energy_sum(&pair));
        assert!(cuts.pair_energy_difference(&pair));
        assert!(cuts.pair_coplanarity(&pair));
        assert!(cuts.pair_time_coincidence(&pair));
    }

    #[test]
    fn test_unmapped_seed_is_geometry_error() {
        let cluster = cluster(&[(99, 1.0)]);
        assert!(IndexedCluster::new(cluster, &table()).unwrap_err().is_fatal());
    }
}
