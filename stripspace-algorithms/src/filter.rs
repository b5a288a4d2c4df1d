//! Angular pre-filter for hit pairs.
//!
//! Full resolution is algebraically heavier than comparing two directions,
//! so every pair first has to pass this cheap test.

use nalgebra::Vector3;
use std::f64::consts::{PI, TAU};
use stripspace_core::SpacePointBuilderConfig;

/// Polar angle and azimuth of a direction, `None` for a null or non-finite vector.
#[inline]
pub fn direction_angles(direction: &Vector3<f64>) -> Option<(f64, f64)> {
    if direction.norm_squared() == 0.0 || !direction.iter().all(|c| c.is_finite()) {
        return None;
    }
    let theta = direction.x.hypot(direction.y).atan2(direction.z);
    let phi = direction.y.atan2(direction.x);
    Some((theta, phi))
}

/// Azimuth difference folded into `[-pi, pi]`.
#[inline]
fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    let mut d = (phi1 - phi2) % TAU;
    if d > PI {
        d -= TAU;
    } else if d < -PI {
        d += TAU;
    }
    d
}

/// Squared polar and azimuthal deviations of two positions seen from `reference`.
fn angular_components(
    pos1: &Vector3<f64>,
    pos2: &Vector3<f64>,
    reference: &Vector3<f64>,
) -> Option<(f64, f64)> {
    let (theta1, phi1) = direction_angles(&(pos1 - reference))?;
    let (theta2, phi2) = direction_angles(&(pos2 - reference))?;
    let dtheta = theta1 - theta2;
    let dphi = delta_phi(phi1, phi2);
    Some((dtheta * dtheta, dphi * dphi))
}

/// `(delta theta)^2 + (delta phi)^2` between two positions seen from `reference`.
///
/// Returns `None` if either direction is undefined.
pub fn angular_difference(
    pos1: &Vector3<f64>,
    pos2: &Vector3<f64>,
    reference: &Vector3<f64>,
) -> Option<f64> {
    angular_components(pos1, pos2, reference).map(|(dt2, dp2)| dt2 + dp2)
}

/// Candidate pair filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFilter {
    diff_theta2: f64,
    diff_phi2: f64,
    diff_dist: f64,
    reference: Vector3<f64>,
}

impl CandidateFilter {
    /// Creates a filter measuring directions from `reference`.
    pub fn new(config: &SpacePointBuilderConfig, reference: Vector3<f64>) -> Self {
        Self {
            diff_theta2: config.diff_theta2,
            diff_phi2: config.diff_phi2,
            diff_dist: config.diff_dist,
            reference,
        }
    }

    /// Point directions are measured from.
    #[inline]
    pub fn reference(&self) -> &Vector3<f64> {
        &self.reference
    }

    /// Angular difference of a pair if it is a candidate, `None` otherwise.
    ///
    /// A candidate lies within `diff_dist` and within both angular thresholds,
    /// so the returned sum never exceeds `diff_theta2 + diff_phi2`.
    pub fn difference(&self, pos1: &Vector3<f64>, pos2: &Vector3<f64>) -> Option<f64> {
        if (pos1 - pos2).norm() > self.diff_dist {
            return None;
        }
        let (dtheta2, dphi2) = angular_components(pos1, pos2, &self.reference)?;
        if dtheta2 > self.diff_theta2 || dphi2 > self.diff_phi2 {
            return None;
        }
        Some(dtheta2 + dphi2)
    }

    /// Returns true if the pair passes the filter.
    #[inline]
    pub fn is_candidate(&self, pos1: &Vector3<f64>, pos2: &Vector3<f64>) -> bool {
        self.difference(pos1, pos2).is_some()
    }
}
