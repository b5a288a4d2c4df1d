//! Geometric resolution of a strip pair into a space point.
//!
//! Both strips are parametrized as `mid + m * q / 2` with `q` pointing from
//! the bottom to the top end, so `m = +1` is the top end, `m = -1` the bottom
//! end and `m = 0` the midpoint. The same convention holds for `n` on the
//! second strip.

use nalgebra::Vector3;
use stripspace_core::{SpacePointBuilderConfig, StripEnds};

/// Relative threshold below which a determinant is treated as zero.
const DETERMINANT_EPSILON: f64 = 1e-12;

/// Relative threshold on the closest-approach denominator (sine squared of
/// the opening angle between the strips).
const PERP_PROJ_EPSILON: f64 = 1e-6;

/// Per-pair resolution workspace.
///
/// Built fresh for every pair; it carries no meaning across pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpacePointParameters {
    /// Vector from the bottom to the top end of the first strip.
    pub q: Vector3<f64>,
    /// Vector from the bottom to the top end of the second strip.
    pub r: Vector3<f64>,
    /// Twice the vector from the vertex to the midpoint of the first strip.
    pub s: Vector3<f64>,
    /// Twice the vector from the vertex to the midpoint of the second strip.
    pub t: Vector3<f64>,
    /// `q x s`.
    pub qs: Vector3<f64>,
    /// `r x t`.
    pub rt: Vector3<f64>,
    /// Magnitude of `q`.
    pub qmag: f64,
    /// Position of the space point on the first strip.
    pub m: f64,
    /// Position of the space point on the second strip.
    pub n: f64,
    /// Nominal bound of `|m|` and `|n|`.
    pub limit: f64,
    /// Relaxed bound used by the recovery.
    pub limit_extended: f64,
}

impl Default for SpacePointParameters {
    fn default() -> Self {
        Self {
            q: Vector3::zeros(),
            r: Vector3::zeros(),
            s: Vector3::zeros(),
            t: Vector3::zeros(),
            qs: Vector3::zeros(),
            rt: Vector3::zeros(),
            qmag: 0.0,
            m: 0.0,
            n: 0.0,
            limit: 1.0,
            limit_extended: 1.0,
        }
    }
}

impl SpacePointParameters {
    /// Workspace holding the strip vectors of a pair.
    pub fn from_strips(first: &StripEnds, second: &StripEnds) -> Self {
        let q = first.direction();
        Self {
            q,
            r: second.direction(),
            qmag: q.norm(),
            ..Self::default()
        }
    }

    /// Returns true if both `|m|` and `|n|` are within `bound`.
    #[inline]
    pub fn within(&self, bound: f64) -> bool {
        self.m.abs() <= bound && self.n.abs() <= bound
    }

    /// Global position at the current `m` on the first strip.
    #[inline]
    pub fn position(&self, first: &StripEnds) -> Vector3<f64> {
        first.point_at(self.m)
    }
}

/// Outcome of a resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Solution {
    /// Ill-posed geometry (e.g. parallel strips); never recovered.
    Degenerate,
    /// Strip parameters of the pair, still subject to the acceptance policy.
    Solved(SpacePointParameters),
}

/// Resolution strategy selected by the configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolverMode {
    /// The point lies on both strips and on a line through the vertex.
    VertexConstrained {
        /// Assumed interaction point.
        vertex: Vector3<f64>,
    },
    /// The point is the closest approach of the two strip lines.
    PerpendicularProjection,
}

impl ResolverMode {
    /// Selects the mode from the configuration.
    pub fn from_config(config: &SpacePointBuilderConfig) -> Self {
        if config.use_perp_proj {
            Self::PerpendicularProjection
        } else {
            Self::VertexConstrained {
                vertex: config.vertex,
            }
        }
    }

    /// Mode name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::VertexConstrained { .. } => "VertexConstrained",
            Self::PerpendicularProjection => "PerpendicularProjection",
        }
    }

    /// Point from which hit directions are measured by the candidate filter.
    ///
    /// The vertex-free mode uses the detector origin so that nothing depends
    /// on the configured vertex.
    pub fn reference_point(&self) -> Vector3<f64> {
        match self {
            Self::VertexConstrained { vertex } => *vertex,
            Self::PerpendicularProjection => Vector3::zeros(),
        }
    }

    /// Whether the recovery may shift the assumed trajectory.
    pub fn allows_trajectory_shift(&self) -> bool {
        matches!(self, Self::VertexConstrained { .. })
    }

    /// Solves for the strip parameters of a pair.
    pub fn solve(&self, first: &StripEnds, second: &StripEnds) -> Solution {
        match self {
            Self::VertexConstrained { vertex } => solve_with_vertex(first, second, vertex),
            Self::PerpendicularProjection => solve_perpendicular(first, second),
        }
    }
}

fn solve_with_vertex(first: &StripEnds, second: &StripEnds, vertex: &Vector3<f64>) -> Solution {
    let mut params = SpacePointParameters::from_strips(first, second);
    params.s = first.top + first.bottom - vertex * 2.0;
    params.t = second.top + second.bottom - vertex * 2.0;
    params.qs = params.q.cross(&params.s);
    params.rt = params.r.cross(&params.t);

    let det_m = params.q.dot(&params.rt);
    let det_n = params.r.dot(&params.qs);
    if det_m.abs() <= DETERMINANT_EPSILON * params.qmag * params.rt.norm()
        || det_n.abs() <= DETERMINANT_EPSILON * params.r.norm() * params.qs.norm()
    {
        return Solution::Degenerate;
    }

    params.m = -params.s.dot(&params.rt) / det_m;
    params.n = -params.t.dot(&params.qs) / det_n;
    Solution::Solved(params)
}

fn solve_perpendicular(first: &StripEnds, second: &StripEnds) -> Solution {
    let mut params = SpacePointParameters::from_strips(first, second);
    let (Some(lambda), Some(mu)) = (
        calc_perp_proj(&first.top, &second.top, &params.q, &params.r),
        calc_perp_proj(&second.top, &first.top, &params.r, &params.q),
    ) else {
        return Solution::Degenerate;
    };
    params.m = 2.0 * lambda + 1.0;
    params.n = 2.0 * mu + 1.0;
    Solution::Solved(params)
}

/// Closest approach of two strip lines without any vertex.
///
/// The first line is `x = a + lambda * q` with its top end `a` and
/// `q = top - bottom`, the second `y = c + mu * r`. Returns `lambda` of the
/// point on the first line closest to the second line; it lies in
/// `[-1, 0]` when that point is on the strip. Returns `None` if the lines
/// are (nearly) parallel.
pub fn calc_perp_proj(
    a: &Vector3<f64>,
    c: &Vector3<f64>,
    q: &Vector3<f64>,
    r: &Vector3<f64>,
) -> Option<f64> {
    let ac = c - a;
    let qq = q.dot(q);
    let rr = r.dot(r);
    let qr = q.dot(r);
    let denom = qq * rr - qr * qr;
    if !(denom > PERP_PROJ_EPSILON * qq * rr) {
        return None;
    }
    Some((ac.dot(q) * rr - ac.dot(r) * qr) / denom)
}
