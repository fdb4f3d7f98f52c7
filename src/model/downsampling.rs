use super::operator::{check_matrix_size, DegradationOperator};
use crate::error::{Error, Result};
use crate::image::{ImageData, ImageSize};
use nalgebra::DMatrix;

/// Strided decimation by an integer factor: `lr(r, c) = hr(r * s, c * s)`.
///
/// The transpose places each low-resolution pixel back on the stride and
/// fills the rest with zeros.
#[derive(Clone, Debug)]
pub struct DownsamplingOperator {
    scale: usize,
}

impl DownsamplingOperator {
    pub fn new(scale: usize) -> Result<Self> {
        if scale == 0 {
            return Err(Error::invalid("scale", "downsampling scale must be >= 1"));
        }
        Ok(Self { scale })
    }

    pub fn scale(&self) -> usize {
        self.scale
    }
}

impl DegradationOperator for DownsamplingOperator {
    fn name(&self) -> &'static str {
        "downsampling"
    }

    fn apply(&self, image: &mut ImageData, _index: usize) -> Result<()> {
        image.decimate(self.scale)
    }

    fn apply_transpose(&self, image: &mut ImageData, _index: usize) -> Result<()> {
        image.upsample_zero_padded(self.scale)
    }

    fn operator_matrix(&self, size: ImageSize, _index: usize) -> Result<DMatrix<f64>> {
        let out = self.output_size(size);
        check_matrix_size(size, out)?;
        let mut matrix = DMatrix::zeros(out.num_pixels(), size.num_pixels());
        for r in 0..out.height {
            for c in 0..out.width {
                let col = (r * self.scale) * size.width + c * self.scale;
                matrix[(r * out.width + c, col)] = 1.0;
            }
        }
        Ok(matrix)
    }

    fn output_size(&self, size: ImageSize) -> ImageSize {
        size.scaled_down(self.scale)
    }

    fn downsampling_scale(&self) -> Option<usize> {
        Some(self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_every_other_sample() {
        let values: Vec<f64> = (0..16).map(|v| v as f64).collect();
        let mut image = ImageData::from_flat(&values, ImageSize::new(4, 4), 1).unwrap();
        let op = DownsamplingOperator::new(2).unwrap();
        op.apply(&mut image, 0).unwrap();
        assert_eq!(image.size(), ImageSize::new(2, 2));
        assert_eq!(image.channel_data(0).unwrap(), &[0.0, 2.0, 8.0, 10.0]);
    }

    #[test]
    fn odd_sizes_round_down() {
        let op = DownsamplingOperator::new(3).unwrap();
        assert_eq!(op.output_size(ImageSize::new(7, 5)), ImageSize::new(2, 1));
        let m = op.operator_matrix(ImageSize::new(7, 5), 0).unwrap();
        assert_eq!((m.nrows(), m.ncols()), (2, 35));
        assert_eq!(m[(1, 3)], 1.0);
    }

    #[test]
    fn zero_scale_is_rejected() {
        assert!(DownsamplingOperator::new(0).is_err());
    }
}
