use crate::errors::{EngineError, EngineResult};

/// Limits for the adaptive integrator. Both caps are hard: a run that hits
/// either one fails instead of returning a partially refined estimate.
#[derive(Debug, Clone, Copy)]
pub struct QuadratureConfig {
    /// Absolute error target for the whole interval.
    pub tolerance: f64,
    /// Maximum integrand evaluations.
    pub max_evaluations: usize,
    /// Bisections every starting panel gets before it may be accepted.
    pub min_depth: u32,
    /// Maximum bisection depth for any subinterval.
    pub max_depth: u32,
}

impl Default for QuadratureConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_evaluations: 100_000,
            min_depth: 6,
            max_depth: 48,
        }
    }
}

/// Outcome of an integration.
#[derive(Debug, Clone, Copy)]
pub struct Quadrature {
    pub value: f64,
    /// Sum of the per-interval Richardson error estimates.
    pub error_estimate: f64,
    pub evaluations: usize,
}

struct Segment {
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    tolerance: f64,
    depth: u32,
}

/// Adaptive Simpson integration of `f` over [a, b].
///
/// [a, b] is first cut at every `breakpoints` entry strictly inside it, so
/// narrow peaks and kinks at known locations are always sampled. Each panel
/// is then bisected until |S(left) + S(right) - S(whole)| <= 15 * tol, with
/// the tolerance halved on each split and no panel accepted above
/// `min_depth`. Uses an explicit stack, so depth is bounded by `max_depth`
/// rather than the call stack.
pub fn integrate<F>(
    mut f: F,
    a: f64,
    b: f64,
    breakpoints: &[f64],
    config: &QuadratureConfig,
) -> EngineResult<Quadrature>
where
    F: FnMut(f64) -> EngineResult<f64>,
{
    if !(a.is_finite() && b.is_finite() && a < b) {
        return Err(EngineError::InvalidRange(format!("integration bounds must satisfy a < b, got [{a}, {b}]")));
    }
    if !(config.tolerance.is_finite() && config.tolerance > 0.0) {
        return Err(EngineError::Config(format!("quadrature tolerance must be > 0, got {}", config.tolerance)));
    }

    let mut evaluations = 0usize;
    let mut eval = |x: f64| -> EngineResult<f64> {
        if evaluations >= config.max_evaluations {
            return Err(EngineError::Aggregation(format!(
                "quadrature exceeded {} integrand evaluations",
                config.max_evaluations
            )));
        }
        evaluations += 1;
        let y = f(x)?;
        if !y.is_finite() {
            return Err(EngineError::Aggregation(format!("integrand not finite at x={x}: {y}")));
        }
        Ok(y)
    };

    let mut knots: Vec<f64> = std::iter::once(a)
        .chain(breakpoints.iter().copied().filter(|x| x.is_finite() && *x > a && *x < b))
        .chain(std::iter::once(b))
        .collect();
    knots.sort_by(f64::total_cmp);
    knots.dedup();

    // Tolerance is shared between panels in proportion to their width.
    let width = b - a;
    let mut stack = Vec::with_capacity(64);
    let mut f_lo = eval(knots[0])?;
    for pair in knots.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        let mid = 0.5 * (lo + hi);
        let (f_mid, f_hi) = (eval(mid)?, eval(hi)?);
        stack.push(Segment {
            a: lo,
            b: hi,
            fa: f_lo,
            fm: f_mid,
            fb: f_hi,
            whole: simpson(lo, hi, f_lo, f_mid, f_hi),
            tolerance: config.tolerance * (hi - lo) / width,
            depth: 0,
        });
        f_lo = f_hi;
    }
    // Leftmost panel on top of the stack.
    stack.reverse();

    let mut value = 0.0;
    let mut error_estimate = 0.0;

    while let Some(seg) = stack.pop() {
        let m = 0.5 * (seg.a + seg.b);
        let lm = 0.5 * (seg.a + m);
        let rm = 0.5 * (m + seg.b);
        let flm = eval(lm)?;
        let frm = eval(rm)?;

        let left = simpson(seg.a, m, seg.fa, flm, seg.fm);
        let right = simpson(m, seg.b, seg.fm, frm, seg.fb);
        let delta = left + right - seg.whole;

        if seg.depth >= config.min_depth && delta.abs() <= 15.0 * seg.tolerance {
            value += left + right + delta / 15.0;
            error_estimate += delta.abs() / 15.0;
            continue;
        }
        if seg.depth >= config.max_depth {
            return Err(EngineError::Aggregation(format!(
                "quadrature hit depth {} on [{}, {}] without meeting tolerance",
                config.max_depth, seg.a, seg.b
            )));
        }

        let tolerance = 0.5 * seg.tolerance;
        let depth = seg.depth + 1;
        stack.push(Segment { a: m, b: seg.b, fa: seg.fm, fm: frm, fb: seg.fb, whole: right, tolerance, depth });
        stack.push(Segment { a: seg.a, b: m, fa: seg.fa, fm: flm, fb: seg.fm, whole: left, tolerance, depth });
    }

    Ok(Quadrature {
        value,
        error_estimate,
        evaluations,
    })
}

#[inline]
fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}
