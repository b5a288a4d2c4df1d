//! Acceptance and recovery of solved strip parameters.

use crate::resolver::SpacePointParameters;
use stripspace_core::SpacePointBuilderConfig;

/// Fate of a solved pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Within the nominal strip bounds.
    Accepted,
    /// Within the relaxed bounds only.
    Recovered,
    /// Outside even the relaxed bounds.
    Rejected,
}

/// Two-tier acceptance policy.
///
/// The nominal tier requires both strip parameters within `limit`. The
/// recovery tier first allows an overrun of `strip_length_tolerance` beyond
/// the strip ends; an overrun of up to `strip_length_gap_tolerance` more
/// is accepted only if shifting the assumed trajectory brings both
/// parameters back onto their strips.
///
/// The shift couples the strips through `q.r`, so it never applies to
/// exactly perpendicular strips: those only recover within the edge tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptancePolicy {
    strip_length_tolerance: f64,
    strip_length_gap_tolerance: f64,
}

impl AcceptancePolicy {
    /// Creates a policy with the given tolerances.
    pub fn new(strip_length_tolerance: f64, strip_length_gap_tolerance: f64) -> Self {
        Self {
            strip_length_tolerance,
            strip_length_gap_tolerance,
        }
    }

    /// Creates a policy from the builder configuration.
    pub fn from_config(config: &SpacePointBuilderConfig) -> Self {
        Self::new(config.strip_length_tolerance, config.strip_length_gap_tolerance)
    }

    /// Classifies a solved pair, possibly adjusting `m` and `n` during recovery.
    pub fn evaluate(&self, params: &mut SpacePointParameters, allow_shift: bool) -> Verdict {
        if params.within(params.limit) {
            Verdict::Accepted
        } else if self.recover(params, allow_shift) {
            Verdict::Recovered
        } else {
            Verdict::Rejected
        }
    }

    /// Tests whether a pair outside the nominal bounds can still be accepted.
    ///
    /// On success `params.m` (and `params.n`) describe the recovered point.
    pub fn recover(&self, params: &mut SpacePointParameters, allow_shift: bool) -> bool {
        if self.strip_length_tolerance <= 0.0 && self.strip_length_gap_tolerance <= 0.0 {
            return false;
        }
        let edge_limit = params.limit + self.strip_length_tolerance.max(0.0);
        params.limit_extended = edge_limit + self.strip_length_gap_tolerance.max(0.0);

        if !params.within(params.limit_extended) {
            return false;
        }
        if params.within(edge_limit) {
            return true;
        }
        if !allow_shift || self.strip_length_gap_tolerance <= 0.0 {
            return false;
        }
        shift_trajectory(params) && params.within(edge_limit)
    }
}

/// Moves `m` and `n` towards zero when both overshoot to the same side.
///
/// The overshoot of `n` is projected onto the first strip via `q.r / |q|^2`
/// so both can be compared; the larger one is removed from both parameters.
/// This corresponds to a shifted trajectory, i.e. a displaced vertex.
fn shift_trajectory(params: &mut SpacePointParameters) -> bool {
    if params.qmag <= 0.0 {
        return false;
    }
    let scale = (params.q.dot(&params.r) / (params.qmag * params.qmag)).abs();
    if scale <= f64::EPSILON {
        return false;
    }
    let limit = params.limit;

    if params.m > limit && params.n > limit {
        let overshoot = (params.m - limit).max((params.n - limit) * scale);
        params.m -= overshoot;
        params.n -= overshoot / scale;
        return true;
    }
    if params.m < -limit && params.n < -limit {
        let overshoot = (-(params.m + limit)).max(-(params.n + limit) * scale);
        params.m += overshoot;
        params.n += overshoot / scale;
        return true;
    }
    false
}
