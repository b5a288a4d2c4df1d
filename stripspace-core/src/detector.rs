//! Planar strip detector geometry.
//!
//! Provides a concrete [`StripGeometry`] implementation: sensors are planar
//! rectangles with a regular Cartesian segmentation, placed in the global
//! frame by a rigid transform. The strip a hit lies on is the segmentation
//! bin containing its local position, elongated along whichever local axis
//! has the larger pitch.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]

use crate::geometry::{StripEnds, StripGeometry};
use crate::{Error, Result};
use nalgebra::{Isometry3, Point3, Rotation3, Translation3, UnitQuaternion, Vector2, Vector3};
use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of a sensor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorId(pub u32);

impl SensorId {
    /// Creates a new sensor identifier.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Digitized strip cluster: a sensor reference plus a local position.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StripCluster {
    /// Sensor the cluster was recorded on.
    pub sensor: SensorId,
    /// Position in the sensor's local frame.
    pub local: Vector2<f64>,
}

impl StripCluster {
    /// Creates a new cluster.
    #[inline]
    pub fn new(sensor: SensorId, x: f64, y: f64) -> Self {
        Self {
            sensor,
            local: Vector2::new(x, y),
        }
    }
}

/// Rectangular segmentation centred on the local origin.
///
/// Covers `[-half_x, half_x] x [-half_y, half_y]` with `bins_x * bins_y`
/// equally sized bins.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CartesianSegmentation {
    half_x: f64,
    half_y: f64,
    bins_x: usize,
    bins_y: usize,
}

impl CartesianSegmentation {
    /// Creates a segmentation, validating extent and bin counts.
    pub fn new(half_x: f64, half_y: f64, bins_x: usize, bins_y: usize) -> Result<Self> {
        if !(half_x.is_finite() && half_x > 0.0 && half_y.is_finite() && half_y > 0.0) {
            return Err(Error::InvalidSegmentation(format!(
                "half lengths must be positive, got ({half_x}, {half_y})"
            )));
        }
        if bins_x == 0 || bins_y == 0 {
            return Err(Error::InvalidSegmentation(format!(
                "bin counts must be non-zero, got ({bins_x}, {bins_y})"
            )));
        }
        Ok(Self {
            half_x,
            half_y,
            bins_x,
            bins_y,
        })
    }

    /// Half length along local x.
    #[inline]
    pub fn half_x(&self) -> f64 {
        self.half_x
    }

    /// Half length along local y.
    #[inline]
    pub fn half_y(&self) -> f64 {
        self.half_y
    }

    /// Bin width along local x.
    #[inline]
    pub fn pitch_x(&self) -> f64 {
        2.0 * self.half_x / self.bins_x as f64
    }

    /// Bin width along local y.
    #[inline]
    pub fn pitch_y(&self) -> f64 {
        2.0 * self.half_y / self.bins_y as f64
    }

    /// Returns `(bin_x, bin_y)` containing the local position, if any.
    pub fn bin(&self, local: &Vector2<f64>) -> Option<(usize, usize)> {
        let bx = search(local.x, self.half_x, self.pitch_x(), self.bins_x)?;
        let by = search(local.y, self.half_y, self.pitch_y(), self.bins_y)?;
        Some((bx, by))
    }

    /// Local `(top, bottom)` ends of the strip containing `local`.
    ///
    /// Strips run along the axis with the larger pitch and sit at the bin
    /// centre of the other axis.
    pub fn strip_ends_local(&self, local: &Vector2<f64>) -> Option<(Vector2<f64>, Vector2<f64>)> {
        let (bx, by) = self.bin(local)?;
        let (px, py) = (self.pitch_x(), self.pitch_y());
        let x_lo = -self.half_x + bx as f64 * px;
        let y_lo = -self.half_y + by as f64 * py;

        if px < py {
            let xc = x_lo + 0.5 * px;
            Some((Vector2::new(xc, y_lo + py), Vector2::new(xc, y_lo)))
        } else {
            let yc = y_lo + 0.5 * py;
            Some((Vector2::new(x_lo + px, yc), Vector2::new(x_lo, yc)))
        }
    }
}

fn search(value: f64, half: f64, pitch: f64, bins: usize) -> Option<usize> {
    if !value.is_finite() || value < -half || value > half {
        return None;
    }
    // The upper boundary belongs to the last bin.
    Some((((value + half) / pitch).floor() as usize).min(bins - 1))
}

/// Planar sensor: segmentation plus local-to-global placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarStripModule {
    segmentation: CartesianSegmentation,
    transform: Isometry3<f64>,
}

impl PlanarStripModule {
    /// Creates a module from its segmentation and local-to-global transform.
    pub fn new(segmentation: CartesianSegmentation, transform: Isometry3<f64>) -> Self {
        Self {
            segmentation,
            transform,
        }
    }

    /// Creates a module centred at `center` whose local x and y axes point
    /// along `axis_x` and `axis_y` in the global frame.
    pub fn with_frame(
        segmentation: CartesianSegmentation,
        center: Vector3<f64>,
        axis_x: Vector3<f64>,
        axis_y: Vector3<f64>,
    ) -> Result<Self> {
        let (Some(ex), Some(ey)) = (axis_x.try_normalize(1e-12), axis_y.try_normalize(1e-12)) else {
            return Err(Error::InvalidFrame("axes must have non-zero length".into()));
        };
        if ex.dot(&ey).abs() > 1e-9 {
            return Err(Error::InvalidFrame(format!(
                "axes are not orthogonal (cosine {:.3e})",
                ex.dot(&ey)
            )));
        }
        let rotation = Rotation3::from_basis_unchecked(&[ex, ey, ex.cross(&ey)]);
        let transform = Isometry3::from_parts(
            Translation3::from(center),
            UnitQuaternion::from_rotation_matrix(&rotation),
        );
        Ok(Self::new(segmentation, transform))
    }

    /// Segmentation of the module.
    #[inline]
    pub fn segmentation(&self) -> &CartesianSegmentation {
        &self.segmentation
    }

    /// Local-to-global transform.
    #[inline]
    pub fn transform(&self) -> &Isometry3<f64> {
        &self.transform
    }

    /// Maps a local surface position into the global frame.
    #[inline]
    pub fn local_to_global(&self, local: &Vector2<f64>) -> Vector3<f64> {
        (self.transform * Point3::new(local.x, local.y, 0.0)).coords
    }
}

/// Registry of planar strip modules keyed by sensor id.
#[derive(Debug, Clone, Default)]
pub struct StripDetector {
    modules: HashMap<SensorId, PlanarStripModule>,
}

impl StripDetector {
    /// Creates an empty detector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module, replacing any previous module with the same id.
    pub fn insert(&mut self, id: SensorId, module: PlanarStripModule) -> Option<PlanarStripModule> {
        self.modules.insert(id, module)
    }

    /// Looks up a module.
    pub fn module(&self, id: SensorId) -> Result<&PlanarStripModule> {
        self.modules.get(&id).ok_or(Error::UnknownSensor(id))
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if no module is registered.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Iterates over registered modules in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&SensorId, &PlanarStripModule)> {
        self.modules.iter()
    }
}

impl StripGeometry<StripCluster> for StripDetector {
    fn local_position(&self, hit: &StripCluster) -> Result<Vector2<f64>> {
        self.module(hit.sensor)?;
        Ok(hit.local)
    }

    fn global_position(&self, hit: &StripCluster) -> Result<Vector3<f64>> {
        Ok(self.module(hit.sensor)?.local_to_global(&hit.local))
    }

    fn strip_ends(&self, hit: &StripCluster) -> Result<StripEnds> {
        let module = self.module(hit.sensor)?;
        let (top, bottom) = module
            .segmentation()
            .strip_ends_local(&hit.local)
            .ok_or(Error::OutsideSegmentation {
                sensor: hit.sensor,
                x: hit.local.x,
                y: hit.local.y,
            })?;
        Ok(StripEnds::new(
            module.local_to_global(&top),
            module.local_to_global(&bottom),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn strip_sensor() -> CartesianSegmentation {
        // 10 strips of pitch 0.2 along x, each 4 long in y.
        CartesianSegmentation::new(1.0, 2.0, 10, 1).unwrap()
    }

    #[test]
    fn test_segmentation_validation() {
        assert!(CartesianSegmentation::new(0.0, 1.0, 1, 1).is_err());
        assert!(CartesianSegmentation::new(1.0, f64::NAN, 1, 1).is_err());
        assert!(CartesianSegmentation::new(1.0, 1.0, 0, 1).is_err());
    }

    #[test]
    fn test_bin_search() {
        let seg = strip_sensor();
        assert_eq!(seg.bin(&Vector2::new(-1.0, 0.0)), Some((0, 0)));
        assert_eq!(seg.bin(&Vector2::new(0.05, 1.9)), Some((5, 0)));
        // Upper edge belongs to the last bin.
        assert_eq!(seg.bin(&Vector2::new(1.0, 2.0)), Some((9, 0)));
        assert_eq!(seg.bin(&Vector2::new(1.01, 0.0)), None);
        assert_eq!(seg.bin(&Vector2::new(0.0, -2.5)), None);
    }

    #[test]
    fn test_strip_ends_along_y() {
        let seg = strip_sensor();
        let (top, bottom) = seg.strip_ends_local(&Vector2::new(0.05, 0.7)).unwrap();
        assert_relative_eq!(top, Vector2::new(0.1, 2.0), epsilon = 1e-12);
        assert_relative_eq!(bottom, Vector2::new(0.1, -2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_strip_ends_along_x() {
        let seg = CartesianSegmentation::new(3.0, 1.0, 1, 4).unwrap();
        let (top, bottom) = seg.strip_ends_local(&Vector2::new(0.0, -0.9)).unwrap();
        assert_relative_eq!(top, Vector2::new(3.0, -0.75), epsilon = 1e-12);
        assert_relative_eq!(bottom, Vector2::new(-3.0, -0.75), epsilon = 1e-12);
    }

    #[test]
    fn test_module_frame() {
        let module = PlanarStripModule::with_frame(
            strip_sensor(),
            Vector3::new(0.0, 5.0, 0.0),
            Vector3::z(),
            Vector3::x(),
        )
        .unwrap();
        let global = module.local_to_global(&Vector2::new(0.5, 1.0));
        assert_relative_eq!(global, Vector3::new(1.0, 5.0, 0.5), epsilon = 1e-12);

        assert!(PlanarStripModule::with_frame(
            strip_sensor(),
            Vector3::zeros(),
            Vector3::x(),
            Vector3::new(1.0, 1.0, 0.0),
        )
        .is_err());
    }

    #[test]
    fn test_detector_geometry() {
        let mut detector = StripDetector::new();
        let module = PlanarStripModule::with_frame(
            strip_sensor(),
            Vector3::zeros(),
            Vector3::x(),
            Vector3::y(),
        )
        .unwrap();
        detector.insert(SensorId::new(7), module);
        assert_eq!(detector.len(), 1);

        let hit = StripCluster::new(SensorId::new(7), 0.05, 0.3);
        let ends = detector.strip_ends(&hit).unwrap();
        assert_relative_eq!(ends.top, Vector3::new(0.1, 2.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(ends.bottom, Vector3::new(0.1, -2.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(
            detector.global_position(&hit).unwrap(),
            Vector3::new(0.05, 0.3, 0.0),
            epsilon = 1e-12
        );

        let unknown = StripCluster::new(SensorId::new(8), 0.0, 0.0);
        assert_eq!(
            detector.global_position(&unknown),
            Err(Error::UnknownSensor(SensorId::new(8)))
        );

        let outside = StripCluster::new(SensorId::new(7), 4.0, 0.0);
        assert!(matches!(
            detector.strip_ends(&outside),
            Err(Error::OutsideSegmentation { .. })
        ));
    }
}
