//! Step-length search shared by the gradient-based minimizers.
use super::minimizer::CostFunction;
use crate::error::Result;

const ARMIJO_C1: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 40;
pub(crate) const EPS: f64 = 1e-300;

/// Accepted point along the search direction.
pub(crate) struct Trial {
    pub alpha: f64,
    pub cost: f64,
    pub x: Vec<f64>,
    pub gradient: Vec<f64>,
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Quadratic-interpolation step followed by Armijo backtracking.
///
/// `slope` is `g . d` at `x` and must be negative. Returns `None` when no
/// step satisfying the sufficient-decrease condition was found.
#[allow(clippy::too_many_arguments)]
pub(crate) fn armijo_line_search<F: CostFunction + ?Sized>(
    f: &mut F,
    x: &[f64],
    cost: f64,
    slope: f64,
    direction: &[f64],
    alpha0: f64,
    evaluations: &mut usize,
) -> Result<Option<Trial>> {
    let mut eval = |alpha: f64, f: &mut F| -> Result<Trial> {
        let point: Vec<f64> = x
            .iter()
            .zip(direction)
            .map(|(xi, di)| xi + alpha * di)
            .collect();
        let mut gradient = vec![0.0; point.len()];
        let cost = f.evaluate(&point, Some(&mut gradient))?;
        *evaluations += 1;
        Ok(Trial {
            alpha,
            cost,
            x: point,
            gradient,
        })
    };
    let armijo = |t: &Trial| t.cost.is_finite() && t.cost <= cost + ARMIJO_C1 * t.alpha * slope;

    let first = eval(alpha0, f)?;
    // Minimizer of the parabola through phi(0), phi'(0) and phi(alpha0).
    let curvature = first.cost - cost - slope * alpha0;
    let mut best = armijo(&first).then_some(first);
    let mut next_alpha = alpha0 * 0.5;
    if curvature > 0.0 {
        let alpha_q = (-slope * alpha0 * alpha0 / (2.0 * curvature))
            .clamp(alpha0 * 1e-4, alpha0 * 1e4);
        let interpolated = eval(alpha_q, f)?;
        if armijo(&interpolated) {
            let better = best
                .as_ref()
                .map_or(true, |b| interpolated.cost < b.cost);
            if better {
                best = Some(interpolated);
            }
        } else {
            next_alpha = next_alpha.min(alpha_q * 0.5);
        }
    }
    if best.is_some() {
        return Ok(best);
    }

    let mut alpha = next_alpha;
    for _ in 0..MAX_BACKTRACKS {
        let trial = eval(alpha, f)?;
        if armijo(&trial) {
            return Ok(Some(trial));
        }
        alpha *= 0.5;
    }
    Ok(None)
}
