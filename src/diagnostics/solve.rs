use super::timing::TimingBreakdown;
use crate::solver::minimizer::InnerTermination;
use serde::{Deserialize, Serialize};

/// Outcome of one conjugate-gradient solve.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InnerSolveSummary {
    pub iterations: usize,
    pub function_evaluations: usize,
    pub initial_cost: f64,
    pub final_cost: f64,
    pub final_gradient_norm: f64,
    pub termination: InnerTermination,
}

impl InnerSolveSummary {
    pub fn converged(&self) -> bool {
        self.termination.is_converged()
    }
}

/// One reweighting round of the IRLS loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrlsIterationReport {
    /// Index of the channel group being solved (always 0 unless channels are
    /// split).
    pub channel_group: usize,
    /// 1-based outer iteration within the channel group.
    pub iteration: usize,
    pub cost: f64,
    /// `previous_cost - cost`; absent on the first iteration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_difference: Option<f64>,
    pub inner: InnerSolveSummary,
    pub elapsed_ms: f64,
}

/// How the outer loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SolveTermination {
    /// The cost difference fell under the threshold, or no regularizer
    /// needed reweighting.
    Converged,
    MaxIterationsReached,
}

/// Full trace of an [`IrlsMapSolver::solve`](crate::solver::IrlsMapSolver::solve).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveReport {
    pub termination: SolveTermination,
    /// Sum of the final objective values of every channel group.
    pub final_cost: f64,
    pub num_parameters: usize,
    pub channel_groups: usize,
    pub iterations: Vec<IrlsIterationReport>,
    pub timing: TimingBreakdown,
}

impl SolveReport {
    pub fn outer_iterations(&self) -> usize {
        self.iterations.len()
    }

    /// True when every inner solve met one of its convergence thresholds.
    pub fn inner_solves_converged(&self) -> bool {
        self.iterations.iter().all(|it| it.inner.converged())
    }
}
