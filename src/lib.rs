#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod diagnostics;
pub mod error;
pub mod evaluation;
pub mod image;
pub mod model;
pub mod motion;
pub mod solver;

// Building blocks of the objective; public for custom terms and priors.
pub mod config;
pub mod objective;
pub mod regularizer;

// --- High-level re-exports -------------------------------------------------

// Main entry points: forward model + solver.
pub use crate::model::{ImageModel, ImageModelParams};
pub use crate::solver::{IrlsMapSolver, IrlsSolverOptions, SolveOutcome};

// Data containers.
pub use crate::image::{ImageData, ImagePlane, ImageSize, Interpolation};
pub use crate::motion::{MotionShift, MotionShiftSequence};

// Diagnostics returned by the solver.
pub use crate::diagnostics::{SolveReport, SolveTermination};

pub use crate::error::{Error, Result};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use super_resolution::prelude::*;
///
/// # fn main() -> super_resolution::Result<()> {
/// let truth = ImageData::zeros(ImageSize::new(16, 16), 1);
/// let model = ImageModel::from_params(&ImageModelParams {
///     motion: [(0.0, 0.0), (0.5, 0.5)].into_iter().collect(),
///     ..Default::default()
/// })?;
/// let observations = model.generate_observations(&truth, 2)?;
///
/// let mut solver = IrlsMapSolver::new(IrlsSolverOptions::default(), &model, &observations)?;
/// solver.add_regularizer(
///     Box::new(TotalVariation::new(solver.hr_size(), solver.num_channels())),
///     0.01,
/// )?;
/// let initial = observations[0].resized(solver.hr_size(), Interpolation::Linear)?;
/// let outcome = solver.solve(&initial)?;
/// println!("{:?} after {} iterations", outcome.report.termination, outcome.report.outer_iterations());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::image::{ImageData, ImageSize, Interpolation};
    pub use crate::model::{DegradationOperator, ImageModel, ImageModelParams};
    pub use crate::regularizer::{BilateralTotalVariation, Regularizer, TotalVariation};
    pub use crate::solver::{IrlsMapSolver, IrlsSolverOptions};
}
