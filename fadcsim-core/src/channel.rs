//! Channel identifiers and calorimeter crystal geometry.

use crate::error::GeometryError;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest crystal x-index magnitude.
pub const MAX_IX: i32 = 23;

/// Largest crystal y-index magnitude.
pub const MAX_IY: i32 = 5;

/// Opaque identifier of a physical readout channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct ChannelId(pub u64);

impl ChannelId {
    /// Creates a new channel identifier.
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for ChannelId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Crystal position in index space.
///
/// The x-index runs over `[-23, 23]` and the y-index over `[-5, 5]`;
/// neither may be zero. Positive y-indices are the top half of the
/// calorimeter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct CrystalIndex {
    ix: i32,
    iy: i32,
}

impl CrystalIndex {
    /// Creates a validated crystal index.
    pub fn new(ix: i32, iy: i32) -> Result<Self, GeometryError> {
        if ix == 0 || ix.abs() > MAX_IX || iy == 0 || iy.abs() > MAX_IY {
            return Err(GeometryError::InvalidIndex { ix, iy });
        }
        Ok(Self { ix, iy })
    }

    /// Returns the x-index.
    #[inline]
    pub fn ix(&self) -> i32 {
        self.ix
    }

    /// Returns the y-index.
    #[inline]
    pub fn iy(&self) -> i32 {
        self.iy
    }

    /// Whether the crystal sits in the top half.
    #[inline]
    pub fn is_top(&self) -> bool {
        self.iy > 0
    }

    /// Distance to another crystal in index units.
    #[inline]
    pub fn distance(&self, other: &Self) -> f64 {
        f64::from(self.ix - other.ix).hypot(f64::from(self.iy - other.iy))
    }

    /// Azimuth around the beam axis, in degrees within `(-180, 180]`.
    #[inline]
    pub fn azimuth_degrees(&self) -> f64 {
        f64::from(self.iy).atan2(f64::from(self.ix)).to_degrees()
    }
}

impl fmt::Display for CrystalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.ix, self.iy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_crystal_index_bounds() {
        assert!(CrystalIndex::new(1, 1).is_ok());
        assert!(CrystalIndex::new(-23, -5).is_ok());
        assert!(CrystalIndex::new(23, 5).is_ok());

        assert_eq!(
            CrystalIndex::new(0, 1),
            Err(GeometryError::InvalidIndex { ix: 0, iy: 1 })
        );
        assert!(CrystalIndex::new(1, 0).is_err());
        assert!(CrystalIndex::new(24, 1).is_err());
        assert!(CrystalIndex::new(1, -6).is_err());
    }

    #[test]
    fn test_top_bottom() {
        assert!(CrystalIndex::new(5, 2).unwrap().is_top());
        assert!(!CrystalIndex::new(5, -2).unwrap().is_top());
    }

    #[test]
    fn test_geometry_helpers() {
        let a = CrystalIndex::new(3, 1).unwrap();
        let b = CrystalIndex::new(-1, -2).unwrap();
        assert_relative_eq!(a.distance(&b), 5.0);
        assert_relative_eq!(CrystalIndex::new(1, 1).unwrap().azimuth_degrees(), 45.0);
        assert_relative_eq!(CrystalIndex::new(-1, -1).unwrap().azimuth_degrees(), -135.0);
    }

    #[test]
    fn test_channel_display() {
        assert_eq!(ChannelId::new(42).to_string(), "42");
        assert_eq!(ChannelId::from(42), ChannelId(42));
    }
}
