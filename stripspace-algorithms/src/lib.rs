//! stripspace-algorithms: Pairing and resolution of strip hits.
//!
//! This crate provides the space point reconstruction pipeline:
//! - **Candidate filter** - angular and distance pre-selection of hit pairs
//! - **Resolver** - vertex-constrained or perpendicular-projection solution
//! - **Recovery** - nominal and relaxed acceptance of solved pairs
//! - **Builder** - orchestration over registered hit groups
//!
#![warn(missing_docs)]

mod builder;
pub mod filter;
mod processing;
pub mod recovery;
pub mod resolver;

pub use builder::{HitGroup, TwoHitsSpacePointBuilder};
pub use filter::{angular_difference, CandidateFilter};
pub use processing::{build_space_points, build_space_points_stream, EventSpacePoints};
pub use recovery::{AcceptancePolicy, Verdict};
pub use resolver::{calc_perp_proj, ResolverMode, Solution, SpacePointParameters};

// Re-export core configuration and output types
pub use stripspace_core::{
    PairingStrategy, SpacePoint, SpacePointBuilderConfig, SpacePointStatistics,
};
