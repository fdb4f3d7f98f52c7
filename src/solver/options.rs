//! Parameter types configuring the IRLS outer loop and the inner minimizer.
//!
//! Defaults favour accuracy on small problems. For large images the inner
//! iteration cap dominates run time; the thresholds are scaled with the
//! problem size by [`IrlsSolverOptions::adjust_thresholds_adaptively`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Algorithm run inside each IRLS round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InnerSolverKind {
    /// Nonlinear conjugate gradient (Polak-Ribiere+).
    #[default]
    ConjugateGradient,
    /// Limited-memory BFGS keeping `lbfgs_memory` correction pairs.
    Lbfgs,
}

/// Choice and stopping rules of the inner minimizer.
///
/// - `max_iterations`: hard cap on iterations per inner solve.
/// - `gradient_norm_threshold`: stop once `||g||_2` falls below this.
/// - `cost_change_threshold`: stop once one iteration lowers the cost by less.
/// - `parameter_change_threshold`: stop once `||x_new - x||_2` falls below this.
/// - `numerical_differentiation`: replace the analytic gradient with central
///   differences of step `numerical_differentiation_step`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InnerSolverOptions {
    pub solver: InnerSolverKind,
    pub lbfgs_memory: usize,
    pub max_iterations: usize,
    pub gradient_norm_threshold: f64,
    pub cost_change_threshold: f64,
    pub parameter_change_threshold: f64,
    pub numerical_differentiation: bool,
    pub numerical_differentiation_step: f64,
}

impl Default for InnerSolverOptions {
    fn default() -> Self {
        Self {
            solver: InnerSolverKind::ConjugateGradient,
            lbfgs_memory: 5,
            max_iterations: 50,
            gradient_norm_threshold: 1e-10,
            cost_change_threshold: 1e-10,
            parameter_change_threshold: 1e-10,
            numerical_differentiation: false,
            numerical_differentiation_step: 1e-6,
        }
    }
}

impl InnerSolverOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::invalid(
                "inner.max_iterations",
                "iteration cap must be positive",
            ));
        }
        if self.lbfgs_memory == 0 {
            return Err(Error::invalid(
                "inner.lbfgs_memory",
                "at least one correction pair is needed",
            ));
        }
        let step = self.numerical_differentiation_step;
        if !step.is_finite() || step <= 0.0 {
            return Err(Error::invalid(
                "inner.numerical_differentiation_step",
                format!("step must be finite and > 0, got {step}"),
            ));
        }
        check_threshold("inner.gradient_norm_threshold", self.gradient_norm_threshold)?;
        check_threshold("inner.cost_change_threshold", self.cost_change_threshold)?;
        check_threshold(
            "inner.parameter_change_threshold",
            self.parameter_change_threshold,
        )
    }

    fn scale_thresholds(&mut self, factor: f64) {
        self.gradient_norm_threshold *= factor;
        self.cost_change_threshold *= factor;
        self.parameter_change_threshold *= factor;
    }
}

/// Outer-loop configuration of [`IrlsMapSolver`](super::IrlsMapSolver).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IrlsSolverOptions {
    /// Cap on reweighting rounds.
    pub max_irls_iterations: usize,
    /// Stop once consecutive outer costs differ by less than this.
    pub irls_cost_difference_threshold: f64,
    /// Solve every channel on its own instead of all channels jointly.
    pub split_channels: bool,
    /// Scale thresholds with the problem size before solving.
    pub adaptive_thresholds: bool,
    pub inner: InnerSolverOptions,
}

impl Default for IrlsSolverOptions {
    fn default() -> Self {
        Self {
            max_irls_iterations: 50,
            irls_cost_difference_threshold: 1e-6,
            split_channels: false,
            adaptive_thresholds: true,
            inner: InnerSolverOptions::default(),
        }
    }
}

impl IrlsSolverOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_irls_iterations == 0 {
            return Err(Error::invalid(
                "max_irls_iterations",
                "iteration cap must be positive",
            ));
        }
        check_threshold(
            "irls_cost_difference_threshold",
            self.irls_cost_difference_threshold,
        )?;
        self.inner.validate()
    }

    /// Multiply every threshold by `num_parameters * lambda_sum` when that
    /// factor is at least one. Thresholds are never scaled down.
    pub fn adjust_thresholds_adaptively(&mut self, num_parameters: usize, lambda_sum: f64) {
        let factor = num_parameters as f64 * lambda_sum;
        if !factor.is_finite() || factor < 1.0 {
            return;
        }
        self.inner.scale_thresholds(factor);
        self.irls_cost_difference_threshold *= factor;
    }
}

fn check_threshold(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::invalid(
            name,
            format!("threshold must be finite and >= 0, got {value}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_caps_and_negative_thresholds_are_rejected() {
        assert!(IrlsSolverOptions::default().validate().is_ok());
        let options = IrlsSolverOptions {
            max_irls_iterations: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());
        let mut options = IrlsSolverOptions::default();
        options.inner.max_iterations = 0;
        assert!(options.validate().is_err());
        let mut options = IrlsSolverOptions::default();
        options.inner.cost_change_threshold = -1.0;
        assert!(options.validate().is_err());
        let mut options = IrlsSolverOptions::default();
        options.inner.lbfgs_memory = 0;
        assert!(options.validate().is_err());
        let mut options = IrlsSolverOptions::default();
        options.inner.numerical_differentiation_step = 0.0;
        assert!(options.validate().is_err());
    }

    #[test]
    fn thresholds_only_scale_up() {
        let mut options = IrlsSolverOptions::default();
        options.adjust_thresholds_adaptively(100, 0.001);
        assert_eq!(options.irls_cost_difference_threshold, 1e-6);

        options.adjust_thresholds_adaptively(100, 0.5);
        assert!((options.irls_cost_difference_threshold - 5e-5).abs() < 1e-18);
        assert!((options.inner.gradient_norm_threshold - 5e-9).abs() < 1e-20);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: IrlsSolverOptions =
            serde_json::from_str(r#"{"split_channels": true, "inner": {"max_iterations": 7}}"#)
                .unwrap();
        assert!(options.split_channels);
        assert_eq!(options.inner.max_iterations, 7);
        assert_eq!(options.max_irls_iterations, 50);
        assert_eq!(options.inner.solver, InnerSolverKind::ConjugateGradient);
    }

    #[test]
    fn inner_solver_kind_is_selected_by_name() {
        let inner: InnerSolverOptions = serde_json::from_str(
            r#"{"solver": "lbfgs", "lbfgs_memory": 3, "numerical_differentiation": true}"#,
        )
        .unwrap();
        assert_eq!(inner.solver, InnerSolverKind::Lbfgs);
        assert_eq!(inner.lbfgs_memory, 3);
        assert!(inner.numerical_differentiation);
        assert_eq!(inner.numerical_differentiation_step, 1e-6);
        assert!(serde_json::from_str::<InnerSolverOptions>(r#"{"solver": "newton"}"#).is_err());
    }
}
