//! Error type shared by the image container, the forward model and the solver.
//!
//! Configuration and bounds problems are reported eagerly through [`Error`].
//! Numerical non-convergence of the inner minimizer is not an error; it is
//! surfaced through [`crate::diagnostics::SolveReport`] instead.

use crate::image::ImageSize;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot super-resolve without any low-resolution observations")]
    EmptyObservations,

    #[error("observation {index} has {found} but observation 0 has {expected}")]
    ObservationMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("image model has no downsampling operator")]
    MissingDownsampling,

    #[error("image model already has a downsampling operator (scale {existing})")]
    DuplicateDownsampling { existing: usize },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(
        "operator matrix for {pixels} pixels exceeds the ceiling of {limit} pixels"
    )]
    OperatorMatrixTooLarge { pixels: usize, limit: usize },

    #[error("motion sequence has {available} shifts but {required} frames are needed")]
    MotionSequenceTooShort { available: usize, required: usize },

    #[error("motion index {index} is out of range (sequence length {len})")]
    MotionIndexOutOfRange { index: usize, len: usize },

    #[error("patch of {width}x{height} is smaller than twice the padding radius {radius}")]
    PatchTooSmall {
        width: usize,
        height: usize,
        radius: usize,
    },

    #[error("{what} index {index} is out of bounds (len {len})")]
    IndexOutOfBounds {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("channel size {found} does not match image size {expected}")]
    ChannelSizeMismatch { expected: ImageSize, found: ImageSize },

    #[error("{what}: expected {expected} values, got {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed motion shift on line {line}: {content:?}")]
    MotionParse { line: usize, content: String },

    #[error("failed to parse config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
