//! Error types for stripspace-core.

use crate::detector::SensorId;
use thiserror::Error;

/// Result type alias for stripspace operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Contract violations raised while resolving space points.
///
/// Geometric non-matches are not errors; they simply produce no space point.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Hit references a sensor unknown to the geometry.
    #[error("hit references unknown sensor {0}")]
    UnknownSensor(SensorId),

    /// Local position does not fall into any bin of the sensor segmentation.
    #[error("local position ({x}, {y}) lies outside the segmentation of sensor {sensor}")]
    OutsideSegmentation { sensor: SensorId, x: f64, y: f64 },

    /// Strip with coincident end points.
    #[error("degenerate strip: top and bottom end coincide at ({x}, {y}, {z})")]
    DegenerateStrip { x: f64, y: f64, z: f64 },

    /// Segmentation with empty extent or no bins.
    #[error("invalid segmentation: {0}")]
    InvalidSegmentation(String),

    /// Sensor frame axes that do not form an orthonormal basis.
    #[error("invalid sensor frame: {0}")]
    InvalidFrame(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
