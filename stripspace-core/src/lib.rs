//! stripspace-core: Core traits and types for strip detector space points.
//!
//! This crate provides the foundational abstractions shared by the
//! reconstruction algorithms: the geometry collaborator contract, a planar
//! strip detector implementing it, the builder configuration and the
//! space point output type.
//!

pub mod config;
pub mod detector;
pub mod error;
pub mod geometry;
pub mod space_point;

pub use config::{PairingStrategy, SpacePointBuilderConfig};
pub use detector::{CartesianSegmentation, PlanarStripModule, SensorId, StripCluster, StripDetector};
pub use error::{Error, Result};
pub use geometry::{StripEnds, StripGeometry};
pub use space_point::{SpacePoint, SpacePointStatistics};

/// Re-exported vector types used throughout the public API.
pub use nalgebra::{Vector2, Vector3};
