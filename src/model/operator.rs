use crate::error::{Error, Result};
use crate::image::{ImageData, ImagePlane, ImageSize};
use nalgebra::DMatrix;
use std::fmt;

/// Largest number of pixels (rows or columns) an explicit operator matrix may
/// span. The dense matrices are meant for verification on tiny images only.
pub const MAX_OPERATOR_MATRIX_PIXELS: usize = 1024;

/// One stage of the forward imaging model.
///
/// Every operator is linear per channel, except stochastic ones (noise) which
/// only act in the forward direction. `index` selects the observation frame,
/// which matters for operators whose effect varies per frame (motion).
pub trait DegradationOperator: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Forward application, in place.
    fn apply(&self, image: &mut ImageData, index: usize) -> Result<()>;

    /// Adjoint application, in place. Changes the image size whenever
    /// [`DegradationOperator::output_size`] does.
    fn apply_transpose(&self, image: &mut ImageData, index: usize) -> Result<()>;

    /// Dense matrix of the operator acting on one channel of `size`.
    ///
    /// Rows are output pixels and columns input pixels, both row-major.
    fn operator_matrix(&self, size: ImageSize, index: usize) -> Result<DMatrix<f64>>;

    /// Size of the forward output for an input of `size`.
    fn output_size(&self, size: ImageSize) -> ImageSize {
        size
    }

    /// `Some(scale)` for the operator that sets the resolution ratio.
    fn downsampling_scale(&self) -> Option<usize> {
        None
    }

    fn is_stochastic(&self) -> bool {
        false
    }

    /// Number of frames the operator has per-frame parameters for, if any.
    fn num_frames(&self) -> Option<usize> {
        None
    }
}

/// Fail unless both matrix dimensions stay under the ceiling.
pub(crate) fn check_matrix_size(input: ImageSize, output: ImageSize) -> Result<()> {
    let pixels = input.num_pixels().max(output.num_pixels());
    if pixels > MAX_OPERATOR_MATRIX_PIXELS {
        return Err(Error::OperatorMatrixTooLarge {
            pixels,
            limit: MAX_OPERATOR_MATRIX_PIXELS,
        });
    }
    Ok(())
}

/// Replace every channel with `f(channel)`, keeping channel sizes consistent.
pub(crate) fn map_channels(
    image: &mut ImageData,
    mut f: impl FnMut(&ImagePlane) -> Result<ImagePlane>,
) -> Result<()> {
    let planes = image
        .channels()
        .iter()
        .map(&mut f)
        .collect::<Result<Vec<_>>>()?;
    if !planes.is_empty() {
        *image = ImageData::from_planes(planes)?;
    }
    Ok(())
}

/// Apply a matrix to a single plane (used in tests to cross-check operators).
pub fn apply_matrix(
    matrix: &DMatrix<f64>,
    plane: &ImagePlane,
    out_size: ImageSize,
) -> Result<ImagePlane> {
    let input = plane.data();
    if matrix.ncols() != input.len() {
        return Err(Error::DimensionMismatch {
            what: "operator matrix columns",
            expected: matrix.ncols(),
            found: input.len(),
        });
    }
    if matrix.nrows() != out_size.num_pixels() {
        return Err(Error::DimensionMismatch {
            what: "operator matrix rows",
            expected: out_size.num_pixels(),
            found: matrix.nrows(),
        });
    }
    let x = nalgebra::DVector::from_column_slice(input);
    let y = matrix * x;
    ImagePlane::from_vec(out_size.width, out_size.height, y.as_slice().to_vec())
}
