use crate::error::{Error, Result};
use crate::image::{ImagePlane, ImageView, ImageViewMut};

/// Trait implemented by separable 1D filters used by the blur operator.
pub trait SeparableFilter {
    /// Return the 1D taps in left-to-right order. The length is odd; the
    /// centre tap sits at `taps().len() / 2`.
    fn taps(&self) -> &[f64];

    fn radius(&self) -> usize {
        self.taps().len() / 2
    }
}

/// Sampled Gaussian normalised to unit sum.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianFilter {
    taps: Vec<f64>,
    sigma: f64,
}

impl GaussianFilter {
    /// Kernel of `size` taps (odd, >= 1) with `exp(-(i - c)^2 / (2 sigma^2))`
    /// weights.
    pub fn new(size: usize, sigma: f64) -> Result<Self> {
        if size == 0 || size % 2 == 0 {
            return Err(Error::invalid(
                "blur_radius",
                format!("kernel size must be odd and >= 1, got {size}"),
            ));
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(Error::invalid(
                "blur_sigma",
                format!("sigma must be positive, got {sigma}"),
            ));
        }
        let centre = (size / 2) as f64;
        let denom = 2.0 * sigma * sigma;
        let mut taps: Vec<f64> = (0..size)
            .map(|i| {
                let d = i as f64 - centre;
                (-d * d / denom).exp()
            })
            .collect();
        let sum: f64 = taps.iter().sum();
        for t in &mut taps {
            *t /= sum;
        }
        Ok(Self { taps, sigma })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl SeparableFilter for GaussianFilter {
    #[inline]
    fn taps(&self) -> &[f64] {
        &self.taps
    }
}

/// Correlate `src` with `taps` along rows and then columns. Samples outside
/// the plane read as zero.
pub(crate) fn correlate_separable(src: &ImagePlane, taps: &[f64]) -> ImagePlane {
    let (w, h) = (src.width(), src.height());
    let radius = taps.len() / 2;
    let mut tmp = ImagePlane::new(w, h);
    for y in 0..h {
        filter_row(src.row(y), tmp.row_mut(y), taps, radius);
    }
    let mut out = ImagePlane::new(w, h);
    let mut column = vec![0.0; h];
    let mut filtered = vec![0.0; h];
    for x in 0..w {
        for (y, v) in column.iter_mut().enumerate() {
            *v = tmp.get(x, y);
        }
        filter_row(&column, &mut filtered, taps, radius);
        for (y, &v) in filtered.iter().enumerate() {
            out.set(x, y, v);
        }
    }
    out
}

/// Adjoint of [`correlate_separable`]: correlation with the reflected taps.
pub(crate) fn correlate_separable_transpose(src: &ImagePlane, taps: &[f64]) -> ImagePlane {
    let reflected: Vec<f64> = taps.iter().rev().copied().collect();
    correlate_separable(src, &reflected)
}

fn filter_row(row: &[f64], out: &mut [f64], taps: &[f64], radius: usize) {
    let n = row.len() as isize;
    for (x, dst_px) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        for (k, &tap) in taps.iter().enumerate() {
            let idx = x as isize + k as isize - radius as isize;
            if idx >= 0 && idx < n {
                acc += tap * row[idx as usize];
            }
        }
        *dst_px = acc;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gaussian_taps_are_normalised_and_symmetric() {
        let filter = GaussianFilter::new(5, 1.0).unwrap();
        let taps = filter.taps();
        assert_eq!(taps.len(), 5);
        assert_eq!(filter.radius(), 2);
        assert_relative_eq!(taps.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(taps[0], taps[4], epsilon = 1e-15);
        assert!(taps[2] > taps[1] && taps[1] > taps[0]);
    }

    #[test]
    fn even_or_empty_kernels_are_rejected() {
        assert!(GaussianFilter::new(4, 1.0).is_err());
        assert!(GaussianFilter::new(0, 1.0).is_err());
        assert!(GaussianFilter::new(3, 0.0).is_err());
    }

    #[test]
    fn single_tap_filter_is_identity() {
        let filter = GaussianFilter::new(1, 0.7).unwrap();
        let src = ImagePlane::from_rows(&[[0.1, 0.9], [0.4, 0.3]]).unwrap();
        assert_eq!(correlate_separable(&src, filter.taps()), src);
    }

    #[test]
    fn zero_border_loses_mass_at_the_edge() {
        let mut src = ImagePlane::new(3, 3);
        src.set(0, 0, 1.0);
        let out = correlate_separable(&src, &[0.25, 0.5, 0.25]);
        assert_relative_eq!(out.get(0, 0), 0.25, epsilon = 1e-12);
        assert_relative_eq!(out.sum(), 0.5625, epsilon = 1e-12);
    }
}
