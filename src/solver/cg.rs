//! Polak–Ribière+ nonlinear conjugate gradient.
//!
//! Each iteration searches along `d` with a quadratic-interpolation step
//! followed by Armijo backtracking. The direction is reset to steepest
//! descent whenever it stops being a descent direction or `beta` would turn
//! negative.

use super::line_search::{armijo_line_search, dot, norm, EPS};
use super::minimizer::{CostFunction, InnerIteration, InnerTermination};
use super::options::InnerSolverOptions;
use crate::diagnostics::InnerSolveSummary;
use crate::error::{Error, Result};
use log::{debug, warn};

#[derive(Clone, Debug, Default)]
pub struct ConjugateGradient {
    options: InnerSolverOptions,
}

impl ConjugateGradient {
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

        let mut direction: Vec<f64> = gradient.iter().map(|g| -g).collect();
        let mut alpha_guess = 1.0 / gnorm.max(EPS);
        let mut termination = InnerTermination::MaxIterations;
        let mut iterations = 0usize;

        for iteration in 1..=opts.max_iterations {
            let mut slope = dot(&gradient, &direction);
            if slope >= 0.0 {
                debug!("cg: restarting with steepest descent at iteration {iteration}");
                for (d, g) in direction.iter_mut().zip(&gradient) {
                    *d = -g;
                }
                slope = -gnorm * gnorm;
            }

            let Some(trial) =
                armijo_line_search(f, x, cost, slope, &direction, alpha_guess, &mut evaluations)?
            else {
                warn!("cg: line search failed at iteration {iteration} (cost {cost:.6e})");
                termination = InnerTermination::LineSearchFailed;
                break;
            };
            iterations = iteration;

            let step_norm = trial.alpha * norm(&direction);
            let cost_change = cost - trial.cost;
            let g_dot_g = (gnorm * gnorm).max(EPS);
            let beta = (dot(&trial.gradient, &trial.gradient)
                - dot(&trial.gradient, &gradient))
                / g_dot_g;
            let beta = beta.max(0.0);

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

            let prev_slope = slope;
            for (d, g) in direction.iter_mut().zip(&gradient) {
                *d = -g + beta * *d;
            }
            let new_slope = dot(&gradient, &direction);
            alpha_guess = if new_slope < 0.0 {
                (trial.alpha * prev_slope / new_slope).max(EPS)
            } else {
                1.0 / gnorm.max(EPS)
            };
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
    use crate::solver::minimizer::test_functions::{coupled_quadratic, Quadratic, Rosenbrock};
    use approx::assert_abs_diff_eq;

    #[test]
    fn solves_a_coupled_quadratic() {
        let mut f = coupled_quadratic();
        let mut x = vec![0.0; 4];
        let mut hook_calls = 0;
        let cg = ConjugateGradient::new(InnerSolverOptions::default());
        let summary = cg.minimize(&mut f, &mut x, |_| hook_calls += 1).unwrap();
        assert!(summary.termination.is_converged(), "{:?}", summary);
        assert_eq!(hook_calls, summary.iterations);
        // Stationarity: (a0 + 1) x0 - x1 = a0 c0, -x0 + (a1 + 1) x1 = a1 c1.
        assert_abs_diff_eq!(2.0 * x[0] - x[1], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(-x[0] + 4.0 * x[1], -6.0, epsilon = 1e-6);
        assert_abs_diff_eq!(x[2], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(x[3], 4.0, epsilon = 1e-6);
        assert!(summary.final_cost < summary.initial_cost);
    }

    #[test]
    fn makes_progress_on_rosenbrock() {
        let mut x = vec![-1.2, 1.0];
        let options = InnerSolverOptions {
            max_iterations: 2000,
            gradient_norm_threshold: 1e-8,
            cost_change_threshold: 0.0,
            parameter_change_threshold: 0.0,
            ..Default::default()
        };
        let summary = ConjugateGradient::new(options)
            .minimize(&mut Rosenbrock, &mut x, |_| {})
            .unwrap();
        assert!(summary.final_cost < 1e-6, "{:?}", summary);
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-2);
    }

    #[test]
    fn starting_at_the_minimum_stops_immediately() {
        let mut f = Quadratic {
            a: vec![1.0, 1.0],
            c: vec![2.0, 2.0],
        };
        let mut x = vec![2.0, 2.0];
        let summary = ConjugateGradient::default()
            .minimize(&mut f, &mut x, |_| {})
            .unwrap();
        assert_eq!(summary.iterations, 0);
        assert_eq!(summary.termination, InnerTermination::GradientNorm);
    }

    #[test]
    fn iteration_cap_is_reported() {
        let mut x = vec![-1.2, 1.0];
        let options = InnerSolverOptions {
            max_iterations: 2,
            ..Default::default()
        };
        let summary = ConjugateGradient::new(options)
            .minimize(&mut Rosenbrock, &mut x, |_| {})
            .unwrap();
        assert_eq!(summary.termination, InnerTermination::MaxIterations);
        assert!(!summary.termination.is_converged());
    }
}
