use super::operator::{check_matrix_size, DegradationOperator};
use crate::error::{Error, Result};
use crate::image::{ImageData, ImageSize};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{thread_rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Zero-mean Gaussian noise added independently to every pixel and channel.
///
/// Without a seed every application draws fresh noise. With a seed, frame
/// `k` always receives the noise drawn from `seed + k`.
#[derive(Clone, Debug)]
pub struct AdditiveNoiseOperator {
    sigma: f64,
    seed: Option<u64>,
}

impl AdditiveNoiseOperator {
    pub fn new(sigma: f64) -> Result<Self> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(Error::invalid(
                "noise_sigma",
                format!("noise standard deviation must be positive, got {sigma}"),
            ));
        }
        Ok(Self { sigma, seed: None })
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl DegradationOperator for AdditiveNoiseOperator {
    fn name(&self) -> &'static str {
        "additive_noise"
    }

    fn apply(&self, image: &mut ImageData, index: usize) -> Result<()> {
        let seed = match self.seed {
            Some(seed) => seed.wrapping_add(index as u64),
            None => thread_rng().next_u64(),
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, self.sigma)
            .map_err(|e| Error::invalid("noise_sigma", e.to_string()))?;
        image.map_in_place(|v| v + normal.sample(&mut rng));
        Ok(())
    }

    /// Noise has no adjoint; the transpose leaves the image untouched.
    fn apply_transpose(&self, _image: &mut ImageData, _index: usize) -> Result<()> {
        Ok(())
    }

    fn operator_matrix(&self, size: ImageSize, _index: usize) -> Result<DMatrix<f64>> {
        check_matrix_size(size, size)?;
        Ok(DMatrix::identity(size.num_pixels(), size.num_pixels()))
    }

    fn is_stochastic(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_noise_is_reproducible_per_frame() {
        let op = AdditiveNoiseOperator::new(0.05).unwrap().with_seed(Some(7));
        let base = ImageData::zeros(ImageSize::new(8, 8), 2);
        let mut a = base.clone();
        let mut b = base.clone();
        let mut c = base.clone();
        op.apply(&mut a, 3).unwrap();
        op.apply(&mut b, 3).unwrap();
        op.apply(&mut c, 4).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.to_flat().iter().any(|&v| v != 0.0));
    }

    #[test]
    fn sample_spread_matches_sigma() {
        let op = AdditiveNoiseOperator::new(0.1).unwrap().with_seed(Some(1));
        let mut image = ImageData::zeros(ImageSize::new(64, 64), 1);
        op.apply(&mut image, 0).unwrap();
        let values = image.to_flat();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 0.01, "mean {mean}");
        assert!((var.sqrt() - 0.1).abs() < 0.01, "std {}", var.sqrt());
    }

    #[test]
    fn non_positive_sigma_is_rejected() {
        assert!(AdditiveNoiseOperator::new(0.0).is_err());
        assert!(AdditiveNoiseOperator::new(f64::NAN).is_err());
    }
}
