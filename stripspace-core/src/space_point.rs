//! Space point output types.

use nalgebra::Vector3;
use std::ops::AddAssign;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A resolved crossing point of a particle through a stereo strip pair.
///
/// The contributing hits are referenced by position: `group` is the index
/// of the registered hit group, `first` and `second` index into that
/// group's first- and second-layer collections.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpacePoint {
    /// Global position.
    pub position: Vector3<f64>,
    /// Index of the hit group the pair belongs to.
    pub group: usize,
    /// Index of the hit in the first-layer collection.
    pub first: usize,
    /// Index of the hit in the second-layer collection.
    pub second: usize,
    /// Whether the point was only accepted through relaxed bounds.
    pub recovered: bool,
}

impl SpacePoint {
    /// Creates a new space point.
    pub fn new(position: Vector3<f64>, group: usize, first: usize, second: usize) -> Self {
        Self {
            position,
            group,
            first,
            second,
            recovered: false,
        }
    }

    /// Marks the point as recovered.
    #[must_use]
    pub fn recovered(mut self, recovered: bool) -> Self {
        self.recovered = recovered;
        self
    }

    /// X coordinate.
    #[inline]
    pub fn x(&self) -> f64 {
        self.position.x
    }

    /// Y coordinate.
    #[inline]
    pub fn y(&self) -> f64 {
        self.position.y
    }

    /// Z coordinate.
    #[inline]
    pub fn z(&self) -> f64 {
        self.position.z
    }
}

/// Counters describing the outcome of the pair search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpacePointStatistics {
    /// Pairs examined by the candidate filter.
    pub pairs_considered: usize,
    /// Pairs discarded by the candidate filter.
    pub filtered_out: usize,
    /// Candidate pairs without a well-posed solution (e.g. parallel strips).
    pub degenerate: usize,
    /// Pairs accepted within the nominal strip bounds.
    pub accepted: usize,
    /// Pairs accepted through the recovery path.
    pub recovered: usize,
    /// Candidate pairs rejected by the acceptance policy.
    pub rejected: usize,
}

impl SpacePointStatistics {
    /// Total number of committed space points.
    #[inline]
    pub fn committed(&self) -> usize {
        self.accepted + self.recovered
    }
}

impl AddAssign for SpacePointStatistics {
    fn add_assign(&mut self, other: Self) {
        self.pairs_considered += other.pairs_considered;
        self.filtered_out += other.filtered_out;
        self.degenerate += other.degenerate;
        self.accepted += other.accepted;
        self.recovered += other.recovered;
        self.rejected += other.rejected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_point() {
        let sp = SpacePoint::new(Vector3::new(1.0, 2.0, 3.0), 0, 4, 5).recovered(true);
        assert!((sp.x() - 1.0).abs() < f64::EPSILON);
        assert!((sp.y() - 2.0).abs() < f64::EPSILON);
        assert!((sp.z() - 3.0).abs() < f64::EPSILON);
        assert_eq!((sp.first, sp.second), (4, 5));
        assert!(sp.recovered);
    }

    #[test]
    fn test_statistics_accumulate() {
        let mut total = SpacePointStatistics::default();
        total += SpacePointStatistics {
            pairs_considered: 4,
            filtered_out: 1,
            degenerate: 1,
            accepted: 1,
            recovered: 1,
            rejected: 0,
        };
        total += SpacePointStatistics {
            pairs_considered: 2,
            rejected: 2,
            ..Default::default()
        };
        assert_eq!(total.pairs_considered, 6);
        assert_eq!(total.rejected, 2);
        assert_eq!(total.committed(), 2);
    }
}
