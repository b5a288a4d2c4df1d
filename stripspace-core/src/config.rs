//! Space point builder configuration.

use crate::{Error, Result};
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How hits of the two layers are combined into pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PairingStrategy {
    /// Every hit of the first layer with every hit of the second layer.
    #[default]
    AllPairs,
    /// Every hit of the first layer with its angularly closest candidate
    /// on the second layer only.
    ClosestMatch,
}

/// Configuration steering pairing, resolution and recovery.
///
/// Lengths are in millimetres, angles in radians. Strip length tolerances
/// are fractions of the strip half-length, i.e. they extend the nominal
/// `[-1, 1]` range of the normalized strip parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpacePointBuilderConfig {
    /// Accepted squared difference in polar angle of two hits.
    pub diff_theta2: f64,
    /// Accepted squared difference in azimuth of two hits.
    pub diff_phi2: f64,
    /// Accepted distance between two hits.
    pub diff_dist: f64,
    /// Allowed overrun of a strip beyond its ends.
    pub strip_length_tolerance: f64,
    /// Additional overrun attributed to the gap between the two sensors.
    pub strip_length_gap_tolerance: f64,
    /// Assumed position of the interaction vertex.
    pub vertex: Vector3<f64>,
    /// Resolve by perpendicular projection instead of the vertex constraint.
    pub use_perp_proj: bool,
    /// Pairing strategy.
    pub pairing: PairingStrategy,
    /// Evaluate candidate pairs on the rayon thread pool.
    pub parallel: bool,
}

impl Default for SpacePointBuilderConfig {
    fn default() -> Self {
        Self {
            diff_theta2: 1.0,
            diff_phi2: 1.0,
            diff_dist: 100.0,
            strip_length_tolerance: 0.01,
            strip_length_gap_tolerance: 0.01,
            vertex: Vector3::zeros(),
            use_perp_proj: false,
            pairing: PairingStrategy::AllPairs,
            parallel: false,
        }
    }
}

impl SpacePointBuilderConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the accepted squared polar angle difference.
    #[must_use]
    pub fn with_diff_theta2(mut self, value: f64) -> Self {
        self.diff_theta2 = value;
        self
    }

    /// Sets the accepted squared azimuth difference.
    #[must_use]
    pub fn with_diff_phi2(mut self, value: f64) -> Self {
        self.diff_phi2 = value;
        self
    }

    /// Sets the accepted hit distance.
    #[must_use]
    pub fn with_diff_dist(mut self, value: f64) -> Self {
        self.diff_dist = value;
        self
    }

    /// Sets the strip length tolerance.
    #[must_use]
    pub fn with_strip_length_tolerance(mut self, value: f64) -> Self {
        self.strip_length_tolerance = value;
        self
    }

    /// Sets the strip gap tolerance.
    #[must_use]
    pub fn with_strip_length_gap_tolerance(mut self, value: f64) -> Self {
        self.strip_length_gap_tolerance = value;
        self
    }

    /// Sets the assumed vertex.
    #[must_use]
    pub fn with_vertex(mut self, vertex: Vector3<f64>) -> Self {
        self.vertex = vertex;
        self
    }

    /// Selects the perpendicular projection mode.
    #[must_use]
    pub fn with_perp_proj(mut self, enabled: bool) -> Self {
        self.use_perp_proj = enabled;
        self
    }

    /// Sets the pairing strategy.
    #[must_use]
    pub fn with_pairing(mut self, pairing: PairingStrategy) -> Self {
        self.pairing = pairing;
        self
    }

    /// Sets whether pairs are evaluated in parallel.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Combined angular threshold applied to the summed deviation.
    #[inline]
    pub fn combined_angular_threshold(&self) -> f64 {
        self.diff_theta2 + self.diff_phi2
    }

    /// Checks thresholds, tolerances and vertex for sane values.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("diff_theta2", self.diff_theta2),
            ("diff_phi2", self.diff_phi2),
            ("diff_dist", self.diff_dist),
            ("strip_length_tolerance", self.strip_length_tolerance),
            ("strip_length_gap_tolerance", self.strip_length_gap_tolerance),
        ];
        for (name, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(Error::ConfigError(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        if !self.vertex.iter().all(|c| c.is_finite()) {
            return Err(Error::ConfigError(format!(
                "vertex must be finite, got ({}, {}, {})",
                self.vertex.x, self.vertex.y, self.vertex.z
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SpacePointBuilderConfig::default();
        assert!((config.diff_theta2 - 1.0).abs() < f64::EPSILON);
        assert!((config.diff_phi2 - 1.0).abs() < f64::EPSILON);
        assert!((config.diff_dist - 100.0).abs() < f64::EPSILON);
        assert!((config.strip_length_tolerance - 0.01).abs() < f64::EPSILON);
        assert!((config.strip_length_gap_tolerance - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.vertex, Vector3::zeros());
        assert!(!config.use_perp_proj);
        assert_eq!(config.pairing, PairingStrategy::AllPairs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = SpacePointBuilderConfig::new()
            .with_diff_theta2(0.1)
            .with_diff_phi2(0.2)
            .with_diff_dist(5.0)
            .with_strip_length_tolerance(0.0)
            .with_strip_length_gap_tolerance(0.0)
            .with_vertex(Vector3::new(0.0, 0.0, 10.0))
            .with_perp_proj(true)
            .with_pairing(PairingStrategy::ClosestMatch)
            .with_parallel(true);

        assert!((config.combined_angular_threshold() - 0.3).abs() < 1e-12);
        assert!((config.diff_dist - 5.0).abs() < f64::EPSILON);
        assert!(config.use_perp_proj);
        assert!(config.parallel);
        assert_eq!(config.pairing, PairingStrategy::ClosestMatch);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let negative = SpacePointBuilderConfig::new().with_strip_length_tolerance(-0.1);
        assert!(matches!(negative.validate(), Err(Error::ConfigError(_))));

        let nan = SpacePointBuilderConfig::new().with_diff_phi2(f64::NAN);
        assert!(nan.validate().is_err());

        let vertex =
            SpacePointBuilderConfig::new().with_vertex(Vector3::new(f64::INFINITY, 0.0, 0.0));
        assert!(vertex.validate().is_err());
    }
}
