//! Two-hit space point builder.
//!
//! Combines hits on two strip detector elements into space points:
//! candidate pairs are selected with the angular filter, solved by the
//! configured [`ResolverMode`] and classified by the [`AcceptancePolicy`].

use crate::filter::{angular_difference, CandidateFilter};
use crate::recovery::{AcceptancePolicy, Verdict};
use crate::resolver::{ResolverMode, Solution};
use log::{debug, trace};
use nalgebra::{Vector2, Vector3};
use rayon::prelude::*;
use stripspace_core::{
    PairingStrategy, Result, SpacePoint, SpacePointBuilderConfig, SpacePointStatistics, StripEnds,
    StripGeometry,
};

/// Hits of one processing unit on the two layers.
#[derive(Debug)]
pub struct HitGroup<'a, H> {
    /// Hits on the first layer.
    pub first: &'a [H],
    /// Hits on the second layer.
    pub second: &'a [H],
}

impl<'a, H> HitGroup<'a, H> {
    /// Creates a group from the two layer collections.
    pub fn new(first: &'a [H], second: &'a [H]) -> Self {
        Self { first, second }
    }

    /// Number of pairs in the cross product of both layers.
    pub fn pair_count(&self) -> usize {
        self.first.len() * self.second.len()
    }
}

impl<H> Clone for HitGroup<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H> Copy for HitGroup<'_, H> {}

/// Result of resolving one candidate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PairOutcome {
    Degenerate,
    Rejected,
    Committed(SpacePoint),
}

/// Builds space points from pairs of hits on two strip detector elements.
///
/// Hits are borrowed from the caller for the lifetime `'a`; the resolved
/// space points are owned by the builder and exposed via
/// [`space_points`](Self::space_points).
pub struct TwoHitsSpacePointBuilder<'a, H, G> {
    config: SpacePointBuilderConfig,
    geometry: G,
    resolver: ResolverMode,
    filter: CandidateFilter,
    policy: AcceptancePolicy,
    groups: Vec<HitGroup<'a, H>>,
    space_points: Vec<SpacePoint>,
    statistics: SpacePointStatistics,
}

impl<'a, H, G> TwoHitsSpacePointBuilder<'a, H, G>
where
    H: Sync,
    G: StripGeometry<H>,
{
    /// Creates a builder, validating the configuration.
    pub fn new(config: SpacePointBuilderConfig, geometry: G) -> Result<Self> {
        config.validate()?;
        let resolver = ResolverMode::from_config(&config);
        let filter = CandidateFilter::new(&config, resolver.reference_point());
        let policy = AcceptancePolicy::from_config(&config);
        Ok(Self {
            config,
            geometry,
            resolver,
            filter,
            policy,
            groups: Vec::new(),
            space_points: Vec::new(),
            statistics: SpacePointStatistics::default(),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &SpacePointBuilderConfig {
        &self.config
    }

    /// Geometry collaborator.
    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    /// Resolution mode selected by the configuration.
    pub fn resolver(&self) -> ResolverMode {
        self.resolver
    }

    /// Registers the hits of one processing unit on both layers.
    pub fn add_hits(&mut self, first: &'a [H], second: &'a [H]) {
        self.groups.push(HitGroup::new(first, second));
    }

    /// Registers several pre-grouped pairs of hit collections.
    pub fn add_hit_groups<I>(&mut self, groups: I)
    where
        I: IntoIterator<Item = HitGroup<'a, H>>,
    {
        self.groups.extend(groups);
    }

    /// Registered hit groups.
    pub fn groups(&self) -> &[HitGroup<'a, H>] {
        &self.groups
    }

    /// Local coordinates of a hit on its sensor.
    pub fn local_coords(&self, hit: &H) -> Result<Vector2<f64>> {
        self.geometry.local_position(hit)
    }

    /// Global coordinates of a hit.
    pub fn global_coords(&self, hit: &H) -> Result<Vector3<f64>> {
        self.geometry.global_position(hit)
    }

    /// Unfiltered `(delta theta)^2 + (delta phi)^2` of two hits.
    ///
    /// `Ok(None)` if a direction cannot be computed.
    pub fn angular_difference(&self, hit1: &H, hit2: &H) -> Result<Option<f64>> {
        let pos1 = self.global_coords(hit1)?;
        let pos2 = self.global_coords(hit2)?;
        Ok(angular_difference(&pos1, &pos2, self.filter.reference()))
    }

    /// Returns true if two hits form a candidate pair.
    pub fn is_candidate(&self, hit1: &H, hit2: &H) -> Result<bool> {
        let pos1 = self.global_coords(hit1)?;
        let pos2 = self.global_coords(hit2)?;
        Ok(self.filter.is_candidate(&pos1, &pos2))
    }

    /// Resolves all registered hit groups and appends the accepted points.
    ///
    /// Appends to the points of previous calls: invoking it twice on the same
    /// hits commits every point twice. Use
    /// [`recalculate_space_points`](Self::recalculate_space_points) to
    /// replace earlier results. On error nothing from this call is committed.
    /// Returns the number of points committed by this call.
    pub fn calculate_space_points(&mut self) -> Result<usize> {
        let mut points = Vec::new();
        let mut statistics = SpacePointStatistics::default();

        for (index, group) in self.groups.iter().enumerate() {
            let (group_points, group_stats) = self.resolve_group(index, group)?;
            debug!(
                "group {index}: {} pairs, {} filtered, {} degenerate, {} accepted, {} recovered, {} rejected",
                group_stats.pairs_considered,
                group_stats.filtered_out,
                group_stats.degenerate,
                group_stats.accepted,
                group_stats.recovered,
                group_stats.rejected
            );
            points.extend(group_points);
            statistics += group_stats;
        }

        let committed = points.len();
        self.space_points.extend(points);
        self.statistics += statistics;
        Ok(committed)
    }

    /// Discards previous results, then resolves all registered hit groups.
    pub fn recalculate_space_points(&mut self) -> Result<usize> {
        self.clear_space_points();
        self.calculate_space_points()
    }

    /// All space points committed since construction or the last reset.
    pub fn space_points(&self) -> &[SpacePoint] {
        &self.space_points
    }

    /// Number of committed space points.
    pub fn len(&self) -> usize {
        self.space_points.len()
    }

    /// Returns true if no space point has been committed.
    pub fn is_empty(&self) -> bool {
        self.space_points.is_empty()
    }

    /// Counters accumulated alongside the committed points.
    pub fn statistics(&self) -> SpacePointStatistics {
        self.statistics
    }

    /// Drops committed space points and statistics, keeping registered hits.
    pub fn clear_space_points(&mut self) {
        self.space_points.clear();
        self.statistics = SpacePointStatistics::default();
    }

    /// Drops registered hits, keeping committed space points.
    pub fn clear_hits(&mut self) {
        self.groups.clear();
    }

    /// Drops registered hits and committed space points.
    pub fn reset(&mut self) {
        self.clear_hits();
        self.clear_space_points();
    }

    /// Consumes the builder, returning the committed space points.
    pub fn into_space_points(self) -> Vec<SpacePoint> {
        self.space_points
    }

    fn resolve_group(
        &self,
        index: usize,
        group: &HitGroup<'a, H>,
    ) -> Result<(Vec<SpacePoint>, SpacePointStatistics)> {
        let mut statistics = SpacePointStatistics::default();

        let (first_pos, first_ends) = self.resolve_hits(group.first)?;
        let (second_pos, second_ends) = self.resolve_hits(group.second)?;

        let candidates = self.select_candidates(&first_pos, &second_pos);
        statistics.pairs_considered = group.pair_count();
        statistics.filtered_out = statistics.pairs_considered - candidates.len();

        let resolve = |&(i, j): &(usize, usize)| {
            self.resolve_pair(index, i, j, &first_ends[i], &second_ends[j])
        };
        let outcomes: Vec<PairOutcome> = if self.config.parallel {
            candidates.par_iter().map(resolve).collect()
        } else {
            candidates.iter().map(resolve).collect()
        };

        let mut points = Vec::new();
        for outcome in outcomes {
            match outcome {
                PairOutcome::Degenerate => statistics.degenerate += 1,
                PairOutcome::Rejected => statistics.rejected += 1,
                PairOutcome::Committed(point) => {
                    if point.recovered {
                        statistics.recovered += 1;
                    } else {
                        statistics.accepted += 1;
                    }
                    points.push(point);
                }
            }
        }
        Ok((points, statistics))
    }

    /// Global positions and strip ends of every hit of one layer.
    ///
    /// Every hit is checked against the geometry, whether or not it ends up
    /// in a candidate pair.
    fn resolve_hits(&self, hits: &[H]) -> Result<(Vec<Vector3<f64>>, Vec<StripEnds>)> {
        let mut positions = Vec::with_capacity(hits.len());
        let mut ends = Vec::with_capacity(hits.len());
        for hit in hits {
            positions.push(self.global_coords(hit)?);
            let strip = self.geometry.strip_ends(hit)?;
            strip.ensure_non_degenerate()?;
            ends.push(strip);
        }
        Ok((positions, ends))
    }

    /// Candidate pairs in evaluation order (first index, then second index).
    fn select_candidates(
        &self,
        first: &[Vector3<f64>],
        second: &[Vector3<f64>],
    ) -> Vec<(usize, usize)> {
        match self.config.pairing {
            PairingStrategy::AllPairs => first
                .iter()
                .enumerate()
                .flat_map(|(i, p1)| {
                    second
                        .iter()
                        .enumerate()
                        .filter(move |(_, p2)| self.filter.is_candidate(p1, p2))
                        .map(move |(j, _)| (i, j))
                })
                .collect(),
            PairingStrategy::ClosestMatch => first
                .iter()
                .enumerate()
                .filter_map(|(i, p1)| {
                    second
                        .iter()
                        .enumerate()
                        .filter_map(|(j, p2)| self.filter.difference(p1, p2).map(|d| (j, d)))
                        .fold(None, |best: Option<(usize, f64)>, (j, d)| match best {
                            Some((_, best_d)) if best_d <= d => best,
                            _ => Some((j, d)),
                        })
                        .map(|(j, _)| (i, j))
                })
                .collect(),
        }
    }

    fn resolve_pair(
        &self,
        group_index: usize,
        i: usize,
        j: usize,
        first: &StripEnds,
        second: &StripEnds,
    ) -> PairOutcome {
        let mut params = match self.resolver.solve(first, second) {
            Solution::Solved(params) => params,
            Solution::Degenerate => {
                trace!("group {group_index} pair ({i}, {j}): degenerate geometry");
                return PairOutcome::Degenerate;
            }
        };

        let verdict = self
            .policy
            .evaluate(&mut params, self.resolver.allows_trajectory_shift());
        trace!(
            "group {group_index} pair ({i}, {j}): m = {:.4}, n = {:.4} -> {verdict:?}",
            params.m,
            params.n
        );
        let recovered = match verdict {
            Verdict::Accepted => false,
            Verdict::Recovered => true,
            Verdict::Rejected => return PairOutcome::Rejected,
        };
        let position = params.position(first);
        PairOutcome::Committed(SpacePoint::new(position, group_index, i, j).recovered(recovered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stripspace_core::Error;

    /// Hit carrying its own global strip ends.
    #[derive(Debug, Clone, Copy)]
    struct Segment(StripEnds);

    struct SegmentGeometry;

    impl StripGeometry<Segment> for SegmentGeometry {
        fn local_position(&self, _hit: &Segment) -> Result<Vector2<f64>> {
            Ok(Vector2::zeros())
        }

        fn global_position(&self, hit: &Segment) -> Result<Vector3<f64>> {
            Ok(hit.0.midpoint())
        }

        fn strip_ends(&self, hit: &Segment) -> Result<StripEnds> {
            Ok(hit.0)
        }
    }

    fn segment(top: [f64; 3], bottom: [f64; 3]) -> Segment {
        Segment(StripEnds::new(Vector3::from(top), Vector3::from(bottom)))
    }

    fn config() -> SpacePointBuilderConfig {
        SpacePointBuilderConfig::new().with_vertex(Vector3::new(0.0, -10.0, 0.5))
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SpacePointBuilderConfig::new().with_diff_dist(-1.0);
        let result = TwoHitsSpacePointBuilder::<Segment, _>::new(config, SegmentGeometry);
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_empty_without_hits() {
        let mut builder =
            TwoHitsSpacePointBuilder::<Segment, _>::new(config(), SegmentGeometry).unwrap();
        assert!(builder.space_points().is_empty());
        assert_eq!(builder.calculate_space_points().unwrap(), 0);
        assert!(builder.is_empty());
    }

    #[test]
    fn test_degenerate_strip_is_fatal() {
        let first = [segment([1.0, 0.0, 0.5], [-1.0, 0.0, 0.5])];
        let second = [segment([0.0, 1.0, 0.5], [0.0, 1.0, 0.5])];
        let mut builder = TwoHitsSpacePointBuilder::new(config(), SegmentGeometry).unwrap();
        builder.add_hits(&first, &second);
        assert!(matches!(
            builder.calculate_space_points(),
            Err(Error::DegenerateStrip { .. })
        ));
        assert!(builder.is_empty());
    }

    /// First strip along x at `(0, 0, 0.5)`; second strip in the plane
    /// `y = 1`, rotated by `angle` about y and placed so that the line from
    /// the vertex hits the strips at `m` and `n`.
    fn stereo_pair(angle: f64, m: f64, n: f64) -> (Segment, Segment) {
        let (sin, cos) = angle.sin_cos();
        let mid = Vector3::new(1.1 * m - n * cos, 1.0, 0.5 - n * sin);
        let half = Vector3::new(cos, 0.0, sin);
        (
            segment([1.0, 0.0, 0.5], [-1.0, 0.0, 0.5]),
            Segment(StripEnds::new(mid + half, mid - half)),
        )
    }

    #[test]
    fn test_gap_overrun_recovered_by_trajectory_shift() {
        let (first, second) = stereo_pair(std::f64::consts::FRAC_PI_3, 1.015, 1.012);
        let (first, second) = ([first], [second]);

        let mut builder = TwoHitsSpacePointBuilder::new(config(), SegmentGeometry).unwrap();
        builder.add_hits(&first, &second);
        builder.calculate_space_points().unwrap();

        assert_eq!(builder.len(), 1);
        let sp = builder.space_points()[0];
        assert!(sp.recovered);
        // The overshoot of m is the larger one, so the point lands on the top end.
        approx::assert_relative_eq!(sp.position, Vector3::new(1.0, 0.0, 0.5), epsilon = 1e-9);
        assert_eq!(builder.statistics().recovered, 1);

        let no_gap = config().with_strip_length_gap_tolerance(0.0);
        let mut builder = TwoHitsSpacePointBuilder::new(no_gap, SegmentGeometry).unwrap();
        builder.add_hits(&first, &second);
        builder.calculate_space_points().unwrap();
        assert!(builder.is_empty());
        assert_eq!(builder.statistics().rejected, 1);
    }

    #[test]
    fn test_perpendicular_strips_are_not_shifted() {
        let (first, second) = stereo_pair(std::f64::consts::FRAC_PI_2, 1.015, 1.012);
        let (first, second) = ([first], [second]);

        let mut builder = TwoHitsSpacePointBuilder::new(config(), SegmentGeometry).unwrap();
        builder.add_hits(&first, &second);
        builder.calculate_space_points().unwrap();

        assert!(builder.is_empty());
        assert_eq!(builder.statistics().rejected, 1);
    }

    #[test]
    fn test_closest_match_keeps_best_candidate() {
        let first = [segment([1.0, 0.0, 0.5], [-1.0, 0.0, 0.5])];
        let second = [
            segment([0.3, 1.0, 1.5], [0.3, 1.0, -0.5]),
            segment([0.0, 1.0, 1.5], [0.0, 1.0, -0.5]),
        ];
        let mut all = TwoHitsSpacePointBuilder::new(config(), SegmentGeometry).unwrap();
        all.add_hits(&first, &second);
        all.calculate_space_points().unwrap();
        assert_eq!(all.len(), 2);

        let closest_config = config().with_pairing(PairingStrategy::ClosestMatch);
        let mut closest = TwoHitsSpacePointBuilder::new(closest_config, SegmentGeometry).unwrap();
        closest.add_hits(&first, &second);
        closest.calculate_space_points().unwrap();
        assert_eq!(closest.len(), 1);
        assert_eq!(closest.space_points()[0].second, 1);
    }
}
