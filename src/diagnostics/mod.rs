//! Diagnostics data model returned by the solver and printed by the demo.
//!
//! `SolveReport` is the main entry point: it records how the IRLS loop ended,
//! one `IrlsIterationReport` per outer iteration (each with the summary of
//! its inner solve), and a timing breakdown.

pub mod solve;
pub mod timing;

pub use crate::image::ImageDataReport;
pub use solve::{InnerSolveSummary, IrlsIterationReport, SolveReport, SolveTermination};
pub use timing::{SolveStage, StageTiming, TimingBreakdown};
