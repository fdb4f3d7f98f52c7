use super::operator::{check_matrix_size, map_channels, DegradationOperator};
use crate::error::{Error, Result};
use crate::image::{ImageData, ImagePlane, ImageSize, ImageView};
use crate::motion::{MotionShift, MotionShiftSequence};
use nalgebra::DMatrix;

/// Sub-pixel translation of each frame by its [`MotionShift`].
///
/// `out(x, y) = in(x - dx, y - dy)` with bilinear interpolation. Samples that
/// fall outside the canvas contribute zero, so content shifted out of view is
/// lost rather than wrapped.
#[derive(Clone, Debug)]
pub struct MotionOperator {
    sequence: MotionShiftSequence,
}

impl MotionOperator {
    pub fn new(sequence: MotionShiftSequence) -> Self {
        Self { sequence }
    }

    pub fn sequence(&self) -> &MotionShiftSequence {
        &self.sequence
    }

    /// Border needed around a patch so every shifted sample stays inside it.
    pub fn padding_radius(&self) -> usize {
        self.sequence.max_abs_shift().ceil() as usize
    }

    /// Shift a padded patch and return its centre without the padding.
    pub fn apply_to_patch(&self, patch: &ImageData, index: usize) -> Result<ImageData> {
        let radius = self.padding_radius();
        let size = patch.size();
        if size.width / 2 < radius || size.height / 2 < radius {
            return Err(Error::PatchTooSmall {
                width: size.width,
                height: size.height,
                radius,
            });
        }
        let mut shifted = patch.clone();
        self.apply(&mut shifted, index)?;
        let inner = ImageSize::new(size.width - 2 * radius, size.height - 2 * radius);
        let mut out = ImageData::new();
        for plane in shifted.channels() {
            let mut crop = ImagePlane::zeros(inner);
            for y in 0..inner.height {
                let src = &plane.row(y + radius)[radius..radius + inner.width];
                for (x, &v) in src.iter().enumerate() {
                    crop.set(x, y, v);
                }
            }
            out.add_channel(crop)?;
        }
        Ok(out)
    }
}

/// Source pixels and weights feeding output pixel `(x, y)`.
fn bilinear_taps(shift: MotionShift, x: usize, y: usize, size: ImageSize) -> Vec<(usize, f64)> {
    let sx = x as f64 - shift.dx;
    let sy = y as f64 - shift.dy;
    let x0 = sx.floor();
    let y0 = sy.floor();
    let fx = sx - x0;
    let fy = sy - y0;
    let corners = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1.0, y0, fx * (1.0 - fy)),
        (x0, y0 + 1.0, (1.0 - fx) * fy),
        (x0 + 1.0, y0 + 1.0, fx * fy),
    ];
    corners
        .into_iter()
        .filter(|&(cx, cy, w)| {
            w > 0.0
                && cx >= 0.0
                && cy >= 0.0
                && (cx as usize) < size.width
                && (cy as usize) < size.height
        })
        .map(|(cx, cy, w)| (cy as usize * size.width + cx as usize, w))
        .collect()
}

fn shift_plane(src: &ImagePlane, shift: MotionShift) -> ImagePlane {
    let size = src.size();
    let input = src.data();
    let mut out = ImagePlane::zeros(size);
    for y in 0..size.height {
        for x in 0..size.width {
            let v = bilinear_taps(shift, x, y, size)
                .into_iter()
                .map(|(i, w)| w * input[i])
                .sum();
            out.set(x, y, v);
        }
    }
    out
}

fn shift_plane_transpose(src: &ImagePlane, shift: MotionShift) -> ImagePlane {
    let size = src.size();
    let mut out = ImagePlane::zeros(size);
    let acc = out.data_mut();
    for y in 0..size.height {
        for x in 0..size.width {
            let v = src.get(x, y);
            if v == 0.0 {
                continue;
            }
            for (i, w) in bilinear_taps(shift, x, y, size) {
                acc[i] += w * v;
            }
        }
    }
    out
}

impl DegradationOperator for MotionOperator {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn apply(&self, image: &mut ImageData, index: usize) -> Result<()> {
        let shift = self.sequence.get(index)?;
        map_channels(image, |plane| Ok(shift_plane(plane, shift)))
    }

    fn apply_transpose(&self, image: &mut ImageData, index: usize) -> Result<()> {
        let shift = self.sequence.get(index)?;
        map_channels(image, |plane| Ok(shift_plane_transpose(plane, shift)))
    }

    fn operator_matrix(&self, size: ImageSize, index: usize) -> Result<DMatrix<f64>> {
        check_matrix_size(size, size)?;
        let shift = self.sequence.get(index)?;
        let n = size.num_pixels();
        let mut matrix = DMatrix::zeros(n, n);
        for y in 0..size.height {
            for x in 0..size.width {
                let row = y * size.width + x;
                for (col, w) in bilinear_taps(shift, x, y, size) {
                    matrix[(row, col)] += w;
                }
            }
        }
        Ok(matrix)
    }

    fn num_frames(&self) -> Option<usize> {
        Some(self.sequence.len())
    }
}
