//! Common surface of the inner minimizers and the selection between them.
use super::cg::ConjugateGradient;
use super::lbfgs::Lbfgs;
use super::options::{InnerSolverKind, InnerSolverOptions};
use crate::diagnostics::InnerSolveSummary;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Differentiable scalar function of a fixed-length parameter vector.
pub trait CostFunction {
    fn num_parameters(&self) -> usize;

    /// Cost at `x`; when `gradient` is given it is overwritten with the
    /// gradient at `x`.
    fn evaluate(&mut self, x: &[f64], gradient: Option<&mut [f64]>) -> Result<f64>;
}

/// Why the minimizer stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InnerTermination {
    GradientNorm,
    CostChange,
    ParameterChange,
    MaxIterations,
    LineSearchFailed,
}

impl InnerTermination {
    /// True when a convergence threshold was met.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            InnerTermination::GradientNorm
                | InnerTermination::CostChange
                | InnerTermination::ParameterChange
        )
    }
}

/// State handed to the per-iteration hook.
#[derive(Clone, Copy, Debug)]
pub struct InnerIteration {
    pub iteration: usize,
    pub cost: f64,
    pub gradient_norm: f64,
    pub step_size: f64,
}

/// Replaces the analytic gradient of `inner` with central differences.
///
/// Costs `2n + 1` evaluations per gradient; meant for checking analytic
/// gradients on small problems.
pub struct NumericalGradient<'f, F: CostFunction + ?Sized> {
    inner: &'f mut F,
    step: f64,
}

impl<'f, F: CostFunction + ?Sized> NumericalGradient<'f, F> {
    pub fn new(inner: &'f mut F, step: f64) -> Self {
        Self { inner, step }
    }
}

impl<F: CostFunction + ?Sized> CostFunction for NumericalGradient<'_, F> {
    fn num_parameters(&self) -> usize {
        self.inner.num_parameters()
    }

    fn evaluate(&mut self, x: &[f64], gradient: Option<&mut [f64]>) -> Result<f64> {
        let cost = self.inner.evaluate(x, None)?;
        if let Some(g) = gradient {
            let mut shifted = x.to_vec();
            for (i, gi) in g.iter_mut().enumerate() {
                let xi = shifted[i];
                shifted[i] = xi + self.step;
                let plus = self.inner.evaluate(&shifted, None)?;
                shifted[i] = xi - self.step;
                let minus = self.inner.evaluate(&shifted, None)?;
                shifted[i] = xi;
                *gi = (plus - minus) / (2.0 * self.step);
            }
        }
        Ok(cost)
    }
}

/// Inner minimizer chosen by [`InnerSolverOptions::solver`].
#[derive(Clone, Debug)]
pub enum InnerMinimizer {
    ConjugateGradient(ConjugateGradient),
    Lbfgs(Lbfgs),
}

impl InnerMinimizer {
    pub fn from_options(options: InnerSolverOptions) -> Self {
        match options.solver {
            InnerSolverKind::ConjugateGradient => {
                InnerMinimizer::ConjugateGradient(ConjugateGradient::new(options))
            }
            InnerSolverKind::Lbfgs => InnerMinimizer::Lbfgs(Lbfgs::new(options)),
        }
    }

    pub fn options(&self) -> &InnerSolverOptions {
        match self {
            InnerMinimizer::ConjugateGradient(cg) => cg.options(),
            InnerMinimizer::Lbfgs(lbfgs) => lbfgs.options(),
        }
    }

    /// Minimize `f` from `x`, differentiating numerically when the options
    /// ask for it.
    pub fn minimize<F: CostFunction + ?Sized>(
        &self,
        f: &mut F,
        x: &mut [f64],
        on_iteration: impl FnMut(&InnerIteration),
    ) -> Result<InnerSolveSummary> {
        let options = self.options();
        if options.numerical_differentiation {
            let mut numeric = NumericalGradient::new(f, options.numerical_differentiation_step);
            self.dispatch(&mut numeric, x, on_iteration)
        } else {
            self.dispatch(f, x, on_iteration)
        }
    }

    fn dispatch<F: CostFunction + ?Sized>(
        &self,
        f: &mut F,
        x: &mut [f64],
        on_iteration: impl FnMut(&InnerIteration),
    ) -> Result<InnerSolveSummary> {
        match self {
            InnerMinimizer::ConjugateGradient(cg) => cg.minimize(f, x, on_iteration),
            InnerMinimizer::Lbfgs(lbfgs) => lbfgs.minimize(f, x, on_iteration),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_functions {
    use super::CostFunction;
    use crate::error::Result;

    /// `sum_i a_i (x_i - c_i)^2 + (x_0 - x_1)^2`
    pub struct Quadratic {
        pub a: Vec<f64>,
        pub c: Vec<f64>,
    }

    impl CostFunction for Quadratic {
        fn num_parameters(&self) -> usize {
            self.a.len()
        }

        fn evaluate(&mut self, x: &[f64], gradient: Option<&mut [f64]>) -> Result<f64> {
            let coupling = x[0] - x[1];
            let mut cost = coupling * coupling;
            for i in 0..x.len() {
                cost += self.a[i] * (x[i] - self.c[i]).powi(2);
            }
            if let Some(g) = gradient {
                for i in 0..x.len() {
                    g[i] = 2.0 * self.a[i] * (x[i] - self.c[i]);
                }
                g[0] += 2.0 * coupling;
                g[1] -= 2.0 * coupling;
            }
            Ok(cost)
        }
    }

    /// Rosenbrock in two dimensions.
    pub struct Rosenbrock;

    impl CostFunction for Rosenbrock {
        fn num_parameters(&self) -> usize {
            2
        }

        fn evaluate(&mut self, x: &[f64], gradient: Option<&mut [f64]>) -> Result<f64> {
            let (a, b) = (1.0 - x[0], x[1] - x[0] * x[0]);
            if let Some(g) = gradient {
                g[0] = -2.0 * a - 400.0 * x[0] * b;
                g[1] = 200.0 * b;
            }
            Ok(a * a + 100.0 * b * b)
        }
    }

    pub fn coupled_quadratic() -> Quadratic {
        Quadratic {
            a: vec![1.0, 3.0, 0.5, 2.0],
            c: vec![1.0, -2.0, 0.5, 4.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_functions::{coupled_quadratic, Rosenbrock};
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn numerical_gradient_matches_the_analytic_one() {
        let x = [0.3, -1.2, 2.0, 0.7];
        let mut analytic = vec![0.0; 4];
        let mut f = coupled_quadratic();
        let cost = f.evaluate(&x, Some(&mut analytic)).unwrap();

        let mut numeric = vec![0.0; 4];
        let mut wrapped = NumericalGradient::new(&mut f, 1e-6);
        assert_eq!(wrapped.num_parameters(), 4);
        assert_eq!(wrapped.evaluate(&x, Some(&mut numeric)).unwrap(), cost);
        for (a, n) in analytic.iter().zip(&numeric) {
            assert_abs_diff_eq!(a, n, epsilon = 1e-6);
        }
    }

    #[test]
    fn options_select_the_minimizer() {
        let lbfgs = InnerSolverOptions {
            solver: InnerSolverKind::Lbfgs,
            ..Default::default()
        };
        assert!(matches!(
            InnerMinimizer::from_options(lbfgs),
            InnerMinimizer::Lbfgs(_)
        ));
        assert!(matches!(
            InnerMinimizer::from_options(InnerSolverOptions::default()),
            InnerMinimizer::ConjugateGradient(_)
        ));
    }

    #[test]
    fn every_minimizer_solves_with_numerical_gradients() {
        for solver in [InnerSolverKind::ConjugateGradient, InnerSolverKind::Lbfgs] {
            let options = InnerSolverOptions {
                solver,
                numerical_differentiation: true,
                ..Default::default()
            };
            let mut f = coupled_quadratic();
            let mut x = vec![0.0; 4];
            let summary = InnerMinimizer::from_options(options)
                .minimize(&mut f, &mut x, |_| {})
                .unwrap();
            assert!(summary.final_cost < summary.initial_cost, "{solver:?}");
            assert_abs_diff_eq!(2.0 * x[0] - x[1], 1.0, epsilon = 1e-4);
            assert_abs_diff_eq!(x[3], 4.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn lbfgs_reaches_the_rosenbrock_valley_floor() {
        let options = InnerSolverOptions {
            solver: InnerSolverKind::Lbfgs,
            max_iterations: 500,
            gradient_norm_threshold: 1e-8,
            cost_change_threshold: 0.0,
            parameter_change_threshold: 0.0,
            ..Default::default()
        };
        let mut x = vec![-1.2, 1.0];
        let summary = InnerMinimizer::from_options(options)
            .minimize(&mut Rosenbrock, &mut x, |_| {})
            .unwrap();
        assert!(summary.final_cost < 1e-6, "{summary:?}");
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-2);
    }
}
