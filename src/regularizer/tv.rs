use super::{check_len, sign, Regularizer};
use crate::error::Result;
use crate::image::ImageSize;
use serde::{Deserialize, Serialize};

/// How the forward differences of a pixel combine into its residual.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TvNorm {
    /// `|dx| + |dy|`.
    #[default]
    Anisotropic,
    /// `sqrt(dx^2 + dy^2)`.
    Isotropic,
}

/// Total variation over forward differences.
///
/// For pixel `p`: `dx = x(right) - x(p)` and `dy = x(below) - x(p)`, each zero
/// when the neighbour lies outside the image. With `use_3d`, `dz` is the
/// difference to the same pixel in the next channel.
///
/// The default norm is [`TvNorm::Anisotropic`]; the Euclidean residual
/// `sqrt(dx^2 + dy^2)` needs `with_norm(TvNorm::Isotropic)`.
#[derive(Clone, Debug)]
pub struct TotalVariation {
    size: ImageSize,
    num_channels: usize,
    norm: TvNorm,
    use_3d: bool,
}

impl TotalVariation {
    pub fn new(size: ImageSize, num_channels: usize) -> Self {
        Self {
            size,
            num_channels,
            norm: TvNorm::default(),
            use_3d: false,
        }
    }

    pub fn with_norm(mut self, norm: TvNorm) -> Self {
        self.norm = norm;
        self
    }

    pub fn with_3d(mut self, use_3d: bool) -> Self {
        self.use_3d = use_3d;
        self
    }

    pub fn norm(&self) -> TvNorm {
        self.norm
    }

    /// Forward neighbours of data point `index` with their differences.
    fn differences(&self, x: &[f64], index: usize) -> [(Option<usize>, f64); 3] {
        let w = self.size.width;
        let h = self.size.height;
        let n = self.size.num_pixels();
        let pixel = index % n;
        let channel = index / n;
        let (row, col) = (pixel / w, pixel % w);
        let diff = |q: Option<usize>| match q {
            Some(q) => (Some(q), x[q] - x[index]),
            None => (None, 0.0),
        };
        let right = (col + 1 < w).then_some(index + 1);
        let below = (row + 1 < h).then_some(index + w);
        let next = (self.use_3d && channel + 1 < self.num_channels).then_some(index + n);
        [diff(right), diff(below), diff(next)]
    }

    fn residual(&self, diffs: &[(Option<usize>, f64); 3]) -> f64 {
        match self.norm {
            TvNorm::Anisotropic => diffs.iter().map(|(_, d)| d.abs()).sum(),
            TvNorm::Isotropic => diffs.iter().map(|(_, d)| d * d).sum::<f64>().sqrt(),
        }
    }
}

impl Regularizer for TotalVariation {
    fn name(&self) -> &'static str {
        "total_variation"
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
        check_len("total variation input", self.num_parameters(), x.len())?;
        Ok((0..x.len())
            .map(|i| self.residual(&self.differences(x, i)))
            .collect())
    }

    fn apply_with_gradient(
        &self,
        x: &[f64],
        constants: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let n = self.num_parameters();
        check_len("total variation input", n, x.len())?;
        check_len("total variation constants", n, constants.len())?;
        let mut residuals = vec![0.0; n];
        let mut gradient = vec![0.0; n];
        for i in 0..n {
            let diffs = self.differences(x, i);
            let r = self.residual(&diffs);
            residuals[i] = r;
            // d(c r^2)/dx = 2 c r dr/dx; each difference d = x(q) - x(p)
            // contributes dr/dd to q and -dr/dd to p.
            let scale = 2.0 * constants[i];
            for (q, d) in diffs {
                let Some(q) = q else { continue };
                let partial = match self.norm {
                    TvNorm::Anisotropic => scale * r * sign(d),
                    TvNorm::Isotropic => scale * d,
                };
                gradient[q] += partial;
                gradient[i] -= partial;
            }
        }
        Ok((residuals, gradient))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::numeric_gradient;
    use super::*;
    use approx::assert_abs_diff_eq;

    const IMAGE: [f64; 9] = [0.0, 0.0, 1.0, 0.0, 1.0, 3.0, -3.0, -1.0, 0.0];

    #[test]
    fn isotropic_residuals_match_hand_computation() {
        let tv = TotalVariation::new(ImageSize::new(3, 3), 1).with_norm(TvNorm::Isotropic);
        let r = tv.apply(&IMAGE).unwrap();
        let expected = [
            0.0,
            2f64.sqrt(),
            2.0,
            10f64.sqrt(),
            2.0 * 2f64.sqrt(),
            3.0,
            2.0,
            1.0,
            0.0,
        ];
        for (got, want) in r.iter().zip(expected) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn anisotropic_residuals_sum_absolute_differences() {
        let tv = TotalVariation::new(ImageSize::new(3, 3), 1);
        assert_eq!(tv.norm(), TvNorm::Anisotropic);
        let r = tv.apply(&IMAGE).unwrap();
        assert_eq!(r, vec![0.0, 2.0, 2.0, 4.0, 4.0, 3.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn isotropic_gradient_matches_finite_differences() {
        let tv = TotalVariation::new(ImageSize::new(3, 3), 1).with_norm(TvNorm::Isotropic);
        let constants = [1.0, 0.5, 2.0, 1.0, 0.25, 1.0, 3.0, 1.0, 1.0];
        let (_, grad) = tv.apply_with_gradient(&IMAGE, &constants).unwrap();
        let numeric = numeric_gradient(&tv, &IMAGE, &constants);
        for (g, n) in grad.iter().zip(&numeric) {
            assert_abs_diff_eq!(*g, *n, epsilon = 1e-5);
        }
    }

    #[test]
    fn anisotropic_gradient_matches_finite_differences_away_from_kinks() {
        let size = ImageSize::new(3, 2);
        let tv = TotalVariation::new(size, 2).with_3d(true);
        let x = [0.1, 0.7, 0.2, 0.9, 0.4, 1.3, 0.35, 0.05, 0.8, 0.6, 1.1, 0.15];
        let constants = vec![1.0; x.len()];
        let (residuals, grad) = tv.apply_with_gradient(&x, &constants).unwrap();
        assert_eq!(residuals, tv.apply(&x).unwrap());
        let numeric = numeric_gradient(&tv, &x, &constants);
        for (g, n) in grad.iter().zip(&numeric) {
            assert_abs_diff_eq!(*g, *n, epsilon = 1e-5);
        }
    }

    #[test]
    fn last_channel_has_no_depth_difference() {
        let tv = TotalVariation::new(ImageSize::new(1, 1), 2).with_3d(true);
        assert_eq!(tv.apply(&[0.25, 1.0]).unwrap(), vec![0.75, 0.0]);
        let flat = TotalVariation::new(ImageSize::new(1, 1), 2);
        assert_eq!(flat.apply(&[0.25, 1.0]).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn wrong_input_length_is_rejected() {
        let tv = TotalVariation::new(ImageSize::new(3, 3), 1);
        assert!(tv.apply(&[0.0; 8]).is_err());
        assert!(tv.apply_with_gradient(&IMAGE, &[1.0; 4]).is_err());
    }
}
