use super::{check_len, sign, Regularizer};
use crate::error::{Error, Result};
use crate::image::ImageSize;

/// Bilateral total variation.
///
/// For pixel `p` the residual sums `decay^(i + j) * |x(p) - x(p + (i, j))|`
/// over offsets `0 <= i, j <= scale_range` (rows down, columns right) whose
/// target lies inside the same channel.
#[derive(Clone, Debug)]
pub struct BilateralTotalVariation {
    size: ImageSize,
    num_channels: usize,
    scale_range: usize,
    spatial_decay: f64,
}

impl BilateralTotalVariation {
    pub fn new(
        size: ImageSize,
        num_channels: usize,
        scale_range: usize,
        spatial_decay: f64,
    ) -> Result<Self> {
        if scale_range < 1 {
            return Err(Error::invalid(
                "scale_range",
                "range must be at least 1 pixel in each direction",
            ));
        }
        if !(spatial_decay > 0.0 && spatial_decay < 1.0) {
            return Err(Error::invalid(
                "spatial_decay",
                format!("decay must lie strictly between 0 and 1, got {spatial_decay}"),
            ));
        }
        Ok(Self {
            size,
            num_channels,
            scale_range,
            spatial_decay,
        })
    }

    /// Visit every in-image offset of data point `index` with its decay factor.
    fn for_each_neighbour(&self, index: usize, mut f: impl FnMut(usize, f64)) {
        let w = self.size.width;
        let n = self.size.num_pixels();
        let pixel = index % n;
        let (row, col) = (pixel / w, pixel % w);
        for i in 0..=self.scale_range {
            if row + i >= self.size.height {
                break;
            }
            for j in 0..=self.scale_range {
                if col + j >= w {
                    break;
                }
                if i == 0 && j == 0 {
                    continue;
                }
                f(index + i * w + j, self.spatial_decay.powi((i + j) as i32));
            }
        }
    }

    fn residual(&self, x: &[f64], index: usize) -> f64 {
        let mut r = 0.0;
        self.for_each_neighbour(index, |q, decay| r += decay * (x[index] - x[q]).abs());
        r
    }
}

impl Regularizer for BilateralTotalVariation {
    fn name(&self) -> &'static str {
        "bilateral_total_variation"
    }

    fn image_size(&self) -> ImageSize {
        self.size
    }

    fn num_channels(&self) -> usize {
        self.num_channels
    }

    fn set_image_dimensions(&mut self, size: ImageSize, num_channels: usize) {
        self.size = size;
        self.num_channels = num_channels;
    }

    fn apply(&self, x: &[f64]) -> Result<Vec<f64>> {
        check_len("bilateral TV input", self.num_parameters(), x.len())?;
        Ok((0..x.len()).map(|i| self.residual(x, i)).collect())
    }

    fn apply_with_gradient(
        &self,
        x: &[f64],
        constants: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let n = self.num_parameters();
        check_len("bilateral TV input", n, x.len())?;
        check_len("bilateral TV constants", n, constants.len())?;
        let residuals = self.apply(x)?;
        let mut gradient = vec![0.0; n];
        for i in 0..n {
            let scale = 2.0 * constants[i] * residuals[i];
            if scale == 0.0 {
                continue;
            }
            self.for_each_neighbour(i, |q, decay| {
                let partial = scale * decay * sign(x[i] - x[q]);
                gradient[i] += partial;
                gradient[q] -= partial;
            });
        }
        Ok((residuals, gradient))
    }
}
