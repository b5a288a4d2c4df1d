//! High-level helpers that run a builder over one or many events.

use crate::builder::TwoHitsSpacePointBuilder;
use log::debug;
use stripspace_core::{
    Result, SpacePoint, SpacePointBuilderConfig, SpacePointStatistics, StripGeometry,
};

/// Space points of one event together with the search counters.
#[derive(Debug, Clone, Default)]
pub struct EventSpacePoints {
    /// Committed space points.
    pub space_points: Vec<SpacePoint>,
    /// Search counters.
    pub statistics: SpacePointStatistics,
}

/// Resolves the space points of a single pair of hit collections.
pub fn build_space_points<H, G>(
    first: &[H],
    second: &[H],
    geometry: &G,
    config: &SpacePointBuilderConfig,
) -> Result<EventSpacePoints>
where
    H: Sync,
    G: StripGeometry<H>,
{
    let mut builder = TwoHitsSpacePointBuilder::new(config.clone(), geometry)?;
    builder.add_hits(first, second);
    builder.calculate_space_points()?;
    let statistics = builder.statistics();
    Ok(EventSpacePoints {
        space_points: builder.into_space_points(),
        statistics,
    })
}

/// Resolves a stream of events, one result per event.
///
/// Stops at the first contract violation.
pub fn build_space_points_stream<'a, H, G, I>(
    events: I,
    geometry: &G,
    config: &SpacePointBuilderConfig,
) -> Result<Vec<EventSpacePoints>>
where
    H: Sync + 'a,
    G: StripGeometry<H>,
    I: IntoIterator<Item = (&'a [H], &'a [H])>,
{
    let mut results = Vec::new();
    let mut total = SpacePointStatistics::default();
    for (first, second) in events {
        let event = build_space_points(first, second, geometry, config)?;
        total += event.statistics;
        results.push(event);
    }
    debug!(
        "{} events: {} space points from {} pairs",
        results.len(),
        total.committed(),
        total.pairs_considered
    );
    Ok(results)
}
