//! IRLS outer loop and the inner minimizers it drives.
pub mod cg;
pub mod irls;
pub mod lbfgs;
pub(crate) mod line_search;
pub mod minimizer;
pub mod options;

pub use self::cg::ConjugateGradient;
pub use self::irls::{IrlsMapSolver, SolveOutcome, SolverState};
pub use self::lbfgs::Lbfgs;
pub use self::minimizer::{
    CostFunction, InnerIteration, InnerMinimizer, InnerTermination, NumericalGradient,
};
pub use self::options::{InnerSolverKind, InnerSolverOptions, IrlsSolverOptions};
