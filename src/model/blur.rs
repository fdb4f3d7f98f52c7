use super::filters::{
    correlate_separable, correlate_separable_transpose, GaussianFilter, SeparableFilter,
};
use super::operator::{check_matrix_size, map_channels, DegradationOperator};
use crate::error::Result;
use crate::image::{ImageData, ImageSize};
use nalgebra::DMatrix;

/// Separable Gaussian point-spread function, identical for every frame.
#[derive(Clone, Debug)]
pub struct BlurOperator {
    filter: GaussianFilter,
}

impl BlurOperator {
    /// `blur_radius` is the (odd) kernel size in taps.
    pub fn new(blur_radius: usize, sigma: f64) -> Result<Self> {
        Ok(Self {
            filter: GaussianFilter::new(blur_radius, sigma)?,
        })
    }

    pub fn filter(&self) -> &GaussianFilter {
        &self.filter
    }
}

impl DegradationOperator for BlurOperator {
    fn name(&self) -> &'static str {
        "blur"
    }

    fn apply(&self, image: &mut ImageData, _index: usize) -> Result<()> {
        let taps = self.filter.taps();
        map_channels(image, |plane| Ok(correlate_separable(plane, taps)))
    }

    fn apply_transpose(&self, image: &mut ImageData, _index: usize) -> Result<()> {
        let taps = self.filter.taps();
        map_channels(image, |plane| Ok(correlate_separable_transpose(plane, taps)))
    }

    fn operator_matrix(&self, size: ImageSize, _index: usize) -> Result<DMatrix<f64>> {
        check_matrix_size(size, size)?;
        let taps = self.filter.taps();
        let radius = self.filter.radius() as isize;
        let (w, h) = (size.width as isize, size.height as isize);
        let n = size.num_pixels();
        let mut matrix = DMatrix::zeros(n, n);
        for y in 0..h {
            for x in 0..w {
                let row = (y * w + x) as usize;
                for (ky, &ty) in taps.iter().enumerate() {
                    let sy = y + ky as isize - radius;
                    if sy < 0 || sy >= h {
                        continue;
                    }
                    for (kx, &tx) in taps.iter().enumerate() {
                        let sx = x + kx as isize - radius;
                        if sx < 0 || sx >= w {
                            continue;
                        }
                        matrix[(row, (sy * w + sx) as usize)] += ty * tx;
                    }
                }
            }
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImagePlane;
    use approx::assert_relative_eq;

    #[test]
    fn blur_preserves_interior_mass() {
        let mut plane = ImagePlane::new(9, 9);
        plane.set(4, 4, 1.0);
        let mut image = ImageData::from_planes(vec![plane]).unwrap();
        let op = BlurOperator::new(3, 1.0).unwrap();
        op.apply(&mut image, 0).unwrap();
        let blurred = image.channel(0).unwrap();
        assert_relative_eq!(blurred.sum(), 1.0, epsilon = 1e-12);
        assert!(blurred.get(4, 4) < 1.0);
        assert_relative_eq!(blurred.get(3, 4), blurred.get(5, 4), epsilon = 1e-15);
    }

    #[test]
    fn gaussian_matrix_is_symmetric() {
        let op = BlurOperator::new(5, 1.5).unwrap();
        let m = op.operator_matrix(ImageSize::new(4, 3), 0).unwrap();
        assert!((&m - m.transpose()).amax() < 1e-15);
    }

    #[test]
    fn invalid_kernel_parameters_fail_at_construction() {
        assert!(BlurOperator::new(2, 1.0).is_err());
        assert!(BlurOperator::new(3, -1.0).is_err());
    }
}
