//! Geometry collaborator contract for strip hits.

use crate::{Error, Result};
use nalgebra::{Vector2, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Global positions of the two physical ends of a strip.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StripEnds {
    /// Top end of the strip.
    pub top: Vector3<f64>,
    /// Bottom end of the strip.
    pub bottom: Vector3<f64>,
}

impl StripEnds {
    /// Creates strip ends from the top and bottom positions.
    #[inline]
    pub fn new(top: Vector3<f64>, bottom: Vector3<f64>) -> Self {
        Self { top, bottom }
    }

    /// Vector pointing from the bottom to the top end.
    #[inline]
    pub fn direction(&self) -> Vector3<f64> {
        self.top - self.bottom
    }

    /// Midpoint of the strip.
    #[inline]
    pub fn midpoint(&self) -> Vector3<f64> {
        (self.top + self.bottom) * 0.5
    }

    /// Length of the strip.
    #[inline]
    pub fn length(&self) -> f64 {
        self.direction().norm()
    }

    /// Point at normalized strip parameter `m` (0 = midpoint, +1 = top, -1 = bottom).
    #[inline]
    pub fn point_at(&self, m: f64) -> Vector3<f64> {
        (self.top + self.bottom + self.direction() * m) * 0.5
    }

    /// Fails with [`Error::DegenerateStrip`] if both ends coincide.
    pub fn ensure_non_degenerate(&self) -> Result<()> {
        if self.length() > 0.0 {
            Ok(())
        } else {
            Err(Error::DegenerateStrip {
                x: self.top.x,
                y: self.top.y,
                z: self.top.z,
            })
        }
    }
}

/// Geometry and digitization service resolving hits into coordinates.
///
/// Implementations must be deterministic and free of observable side
/// effects. A hit whose sensor association cannot be resolved is a contract
/// violation and must be reported as an error, not silently skipped.
pub trait StripGeometry<H>: Send + Sync {
    /// Position of the hit in the local frame of its sensor.
    fn local_position(&self, hit: &H) -> Result<Vector2<f64>>;

    /// Position of the hit in the global frame.
    fn global_position(&self, hit: &H) -> Result<Vector3<f64>>;

    /// Global positions of the ends of the strip the hit lies on.
    fn strip_ends(&self, hit: &H) -> Result<StripEnds>;
}

impl<H, G: StripGeometry<H> + ?Sized> StripGeometry<H> for &G {
    #[inline]
    fn local_position(&self, hit: &H) -> Result<Vector2<f64>> {
        (**self).local_position(hit)
    }

    #[inline]
    fn global_position(&self, hit: &H) -> Result<Vector3<f64>> {
        (**self).global_position(hit)
    }

    #[inline]
    fn strip_ends(&self, hit: &H) -> Result<StripEnds> {
        (**self).strip_ends(hit)
    }
}
