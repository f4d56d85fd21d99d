//! Clusters of calibrated hits.

use crate::calibration::ChannelTable;
use crate::channel::CrystalIndex;
use crate::error::{Error, Result};
use crate::hit::{CalibratedHit, Hit};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Hits grouped around a seed.
///
/// The first hit is the seed; clustering stages place it there. A
/// cluster is never empty.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Cluster {
    hits: Vec<CalibratedHit>,
}

impl Cluster {
    /// Creates a cluster whose first hit is the seed.
    pub fn new(hits: Vec<CalibratedHit>) -> Result<Self> {
        if hits.is_empty() {
            return Err(Error::EmptyCluster);
        }
        Ok(Self { hits })
    }

    /// Seed hit.
    #[inline]
    pub fn seed(&self) -> &CalibratedHit {
        &self.hits[0]
    }

    /// Seed hit energy (GeV).
    #[inline]
    pub fn seed_energy(&self) -> f64 {
        self.seed().energy()
    }

    /// Sum of hit energies (GeV).
    pub fn total_energy(&self) -> f64 {
        self.hits.iter().map(Hit::energy).sum()
    }

    /// Number of hits.
    #[inline]
    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }

    /// Cluster time, taken from the seed (ns).
    #[inline]
    pub fn time(&self) -> f64 {
        self.seed().time()
    }

    /// Crystal of the seed hit.
    pub fn seed_index(&self, table: &ChannelTable) -> Result<CrystalIndex> {
        table.crystal(self.seed().channel())
    }

    /// Returns the hits, seed first.
    pub fn hits(&self) -> &[CalibratedHit] {
        &self.hits
    }

    /// Returns an iterator over the hits.
    pub fn iter(&self) -> impl Iterator<Item = &CalibratedHit> {
        self.hits.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{reload, ChannelRecord};
    use crate::channel::ChannelId;
    use approx::assert_relative_eq;

    #[test]
    fn test_cluster_quantities() {
        let cluster = Cluster::new(vec![
            CalibratedHit::new(ChannelId(1), 0.6, 20.0),
            CalibratedHit::new(ChannelId(2), 0.3, 24.0),
            CalibratedHit::new(ChannelId(3), 0.1, 28.0),
        ])
        .unwrap();

        assert_relative_eq!(cluster.seed_energy(), 0.6);
        assert_relative_eq!(cluster.total_energy(), 1.0);
        assert_eq!(cluster.hit_count(), 3);
        assert_relative_eq!(cluster.time(), 20.0);
        assert_eq!(cluster.iter().count(), 3);
    }

    #[test]
    fn test_empty_cluster_rejected() {
        assert_eq!(Cluster::new(Vec::new()), Err(Error::EmptyCluster));
    }

    #[test]
    fn test_seed_index() {
        let table = reload(&[ChannelRecord::new(ChannelId(1), -4, 2, 0.1, 100.0, 0.0)]).unwrap();
        let cluster = Cluster::new(vec![CalibratedHit::new(ChannelId(1), 0.6, 20.0)]).unwrap();
        assert_eq!(cluster.seed_index(&table).unwrap(), CrystalIndex::new(-4, 2).unwrap());
    }
}
