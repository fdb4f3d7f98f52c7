//! Limited-memory BFGS with the two-loop recursion.
//!
//! Keeps the last `lbfgs_memory` curvature pairs `(s, y)`. Pairs with
//! `s . y <= 0` are discarded so the implicit Hessian stays positive
//! definite; when the history produces an ascent direction it is cleared and
//! the step falls back to steepest descent.

use super::line_search::{armijo_line_search, dot, norm, EPS};
use super::minimizer::{CostFunction, InnerIteration, InnerTermination};
use super::options::InnerSolverOptions;
use crate::diagnostics::InnerSolveSummary;
use crate::error::{Error, Result};
use log::{debug, warn};
use std::collections::VecDeque;

#[derive(Clone, Debug, Default)]
pub struct Lbfgs {
    options: InnerSolverOptions,
}

struct CurvaturePair {
    s: Vec<f64>,
    y: Vec<f64>,
    rho: f64,
}

/// `-H g` for the inverse Hessian approximation encoded by `history`.
fn two_loop_direction(gradient: &[f64], history: &VecDeque<CurvaturePair>) -> Vec<f64> {
    let mut q = gradient.to_vec();
    let mut alphas = Vec::with_capacity(history.len());
    for pair in history.iter().rev() {
        let a = pair.rho * dot(&pair.s, &q);
        for (qi, yi) in q.iter_mut().zip(&pair.y) {
            *qi -= a * yi;
        }
        alphas.push(a);
    }
    if let Some(last) = history.back() {
        let gamma = dot(&last.s, &last.y) / dot(&last.y, &last.y).max(EPS);
        q.iter_mut().for_each(|qi| *qi *= gamma);
    }
    for (pair, a) in history.iter().zip(alphas.iter().rev()) {
        let b = pair.rho * dot(&pair.y, &q);
        for (qi, si) in q.iter_mut().zip(&pair.s) {
            *qi += (a - b) * si;
        }
    }
    q.iter_mut().for_each(|qi| *qi = -*qi);
    q
}

impl Lbfgs {
    pub fn new(options: InnerSolverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &InnerSolverOptions {
        &self.options
    }

    /// Minimize `f` starting from `x`; `x` holds the best point on return.
    pub fn minimize<F: CostFunction + ?Sized>(
        &self,
        f: &mut F,
        x: &mut [f64],
        mut on_iteration: impl FnMut(&InnerIteration),
    ) -> Result<InnerSolveSummary> {
        let n = f.num_parameters();
        if x.len() != n {
            return Err(Error::DimensionMismatch {
                what: "minimizer start point",
                expected: n,
                found: x.len(),
            });
        }
        let opts = &self.options;
        let memory = opts.lbfgs_memory.max(1);
        let mut gradient = vec![0.0; n];
        let mut cost = f.evaluate(x, Some(&mut gradient))?;
        let mut evaluations = 1usize;
        let initial_cost = cost;
        let mut gnorm = norm(&gradient);

        let mut summary = InnerSolveSummary {
            iterations: 0,
            function_evaluations: 0,
            initial_cost,
            final_cost: cost,
            final_gradient_norm: gnorm,
            termination: InnerTermination::MaxIterations,
        };
        if gnorm <= opts.gradient_norm_threshold {
            summary.function_evaluations = evaluations;
            summary.termination = InnerTermination::GradientNorm;
            return Ok(summary);
        }

        let mut history: VecDeque<CurvaturePair> = VecDeque::with_capacity(memory);
        let mut termination = InnerTermination::MaxIterations;
        let mut iterations = 0usize;

        for iteration in 1..=opts.max_iterations {
            let mut direction = two_loop_direction(&gradient, &history);
            let mut slope = dot(&gradient, &direction);
            if slope >= 0.0 {
                debug!("lbfgs: dropping curvature history at iteration {iteration}");
                history.clear();
                direction = gradient.iter().map(|g| -g).collect();
                slope = -gnorm * gnorm;
            }
            // The two-loop direction is already scaled; plain descent is not.
            let alpha0 = if history.is_empty() {
                1.0 / gnorm.max(EPS)
            } else {
                1.0
            };

            let Some(trial) =
                armijo_line_search(f, x, cost, slope, &direction, alpha0, &mut evaluations)?
            else {
                warn!("lbfgs: line search failed at iteration {iteration} (cost {cost:.6e})");
                termination = InnerTermination::LineSearchFailed;
                break;
            };
            iterations = iteration;

            let s: Vec<f64> = trial.x.iter().zip(x.iter()).map(|(a, b)| a - b).collect();
            let y: Vec<f64> = trial
                .gradient
                .iter()
                .zip(&gradient)
                .map(|(a, b)| a - b)
                .collect();
            let sy = dot(&s, &y);
            let step_norm = norm(&s);
            let cost_change = cost - trial.cost;
            if sy > EPS {
                if history.len() == memory {
                    history.pop_front();
                }
                history.push_back(CurvaturePair { s, y, rho: 1.0 / sy });
            }

            x.copy_from_slice(&trial.x);
            gradient = trial.gradient;
            cost = trial.cost;
            gnorm = norm(&gradient);
            on_iteration(&InnerIteration {
                iteration,
                cost,
                gradient_norm: gnorm,
                step_size: trial.alpha,
            });

            if gnorm <= opts.gradient_norm_threshold {
                termination = InnerTermination::GradientNorm;
                break;
            }
            if cost_change.abs() <= opts.cost_change_threshold {
                termination = InnerTermination::CostChange;
                break;
            }
            if step_norm <= opts.parameter_change_threshold {
                termination = InnerTermination::ParameterChange;
                break;
            }
        }

        summary.iterations = iterations;
        summary.function_evaluations = evaluations;
        summary.final_cost = cost;
        summary.final_gradient_norm = gnorm;
        summary.termination = termination;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::minimizer::test_functions::coupled_quadratic;
    use crate::solver::options::InnerSolverKind;
    use approx::assert_abs_diff_eq;

    fn options() -> InnerSolverOptions {
        InnerSolverOptions {
            solver: InnerSolverKind::Lbfgs,
            ..Default::default()
        }
    }

    #[test]
    fn solves_a_coupled_quadratic() {
        let mut f = coupled_quadratic();
        let mut x = vec![0.0; 4];
        let mut hook_calls = 0;
        let summary = Lbfgs::new(options())
            .minimize(&mut f, &mut x, |_| hook_calls += 1)
            .unwrap();
        assert!(summary.termination.is_converged(), "{summary:?}");
        assert_eq!(hook_calls, summary.iterations);
        assert_abs_diff_eq!(2.0 * x[0] - x[1], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(-x[0] + 4.0 * x[1], -6.0, epsilon = 1e-6);
        assert_abs_diff_eq!(x[2], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(x[3], 4.0, epsilon = 1e-6);
    }

    #[test]
    fn two_loop_without_history_is_steepest_descent() {
        let direction = two_loop_direction(&[1.0, -2.0], &VecDeque::new());
        assert_eq!(direction, vec![-1.0, 2.0]);
    }

    #[test]
    fn two_loop_with_one_pair_satisfies_the_secant_condition() {
        // H y = s must hold for the most recent pair.
        let s = vec![1.0, 0.5];
        let y = vec![2.0, 3.0];
        let rho = 1.0 / dot(&s, &y);
        let history = VecDeque::from(vec![CurvaturePair {
            s: s.clone(),
            y: y.clone(),
            rho,
        }]);
        let direction = two_loop_direction(&y, &history);
        assert_abs_diff_eq!(direction[0], -s[0], epsilon = 1e-12);
        assert_abs_diff_eq!(direction[1], -s[1], epsilon = 1e-12);
    }

    #[test]
    fn mismatched_start_point_is_rejected() {
        let mut f = coupled_quadratic();
        let mut x = vec![0.0; 3];
        assert!(matches!(
            Lbfgs::new(options()).minimize(&mut f, &mut x, |_| {}),
            Err(Error::DimensionMismatch { expected: 4, found: 3, .. })
        ));
    }
}
