use super::ObjectiveTerm;
use crate::error::{Error, Result};
use crate::image::{ImageData, ImageSize, Interpolation};
use crate::model::ImageModel;

/// Fidelity of the estimate to every observation under the image model.
///
/// Observations are stored already resampled (nearest) to the
/// high-resolution canvas. For frame `k` the residual is the degraded
/// estimate, resampled the same way, minus observation `k`. Each
/// low-resolution residual is thereby replicated `scale^2` times, so the sum
/// of squares is divided by `scale^2` to report exactly `||A_k x - y_k||^2`.
pub struct DataTerm<'a> {
    model: &'a ImageModel,
    observations: &'a [ImageData],
    size: ImageSize,
    num_channels: usize,
    scale: usize,
}

impl<'a> DataTerm<'a> {
    pub fn new(
        model: &'a ImageModel,
        observations: &'a [ImageData],
        size: ImageSize,
        num_channels: usize,
    ) -> Result<Self> {
        let scale = model.downsampling_scale()?;
        for (index, obs) in observations.iter().enumerate() {
            if obs.size() != size || obs.num_channels() != num_channels {
                return Err(Error::ObservationMismatch {
                    index,
                    expected: format!("{size} x {num_channels} channels"),
                    found: format!("{} x {} channels", obs.size(), obs.num_channels()),
                });
            }
        }
        Ok(Self {
            model,
            observations,
            size,
            num_channels,
            scale,
        })
    }

    fn compute_for_observation(
        &self,
        index: usize,
        observation: &ImageData,
        x: &[f64],
        gradient: Option<&mut [f64]>,
    ) -> Result<f64> {
        let mut degraded = ImageData::from_flat(x, self.size, self.num_channels)?;
        self.model.apply_linear(&mut degraded, index)?;
        let lr_size = degraded.size();
        degraded.resize(self.size, Interpolation::Nearest)?;

        let mut residual = degraded;
        let mut sum_sq = 0.0;
        for c in 0..self.num_channels {
            let obs = observation.channel_data(c)?;
            for (r, &y) in residual.channel_data_mut(c)?.iter_mut().zip(obs) {
                *r -= y;
                sum_sq += *r * *r;
            }
        }

        if let Some(gradient) = gradient {
            residual.resize(lr_size, Interpolation::Nearest)?;
            self.model.apply_transpose(&mut residual, index)?;
            for (g, r) in gradient.iter_mut().zip(residual.to_flat()) {
                *g += 2.0 * r;
            }
        }

        Ok(sum_sq / (self.scale * self.scale) as f64)
    }
}

impl ObjectiveTerm for DataTerm<'_> {
    fn compute(&self, x: &[f64], mut gradient: Option<&mut [f64]>) -> Result<f64> {
        let mut cost = 0.0;
        for (index, observation) in self.observations.iter().enumerate() {
            cost +=
                self.compute_for_observation(index, observation, x, gradient.as_deref_mut())?;
        }
        Ok(cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageModelParams;
    use approx::assert_abs_diff_eq;

    fn setup() -> (ImageModel, Vec<ImageData>, ImageData) {
        let params = ImageModelParams {
            scale: 2,
            blur_radius: 3,
            blur_sigma: 0.8,
            motion: [(0.0, 0.0), (0.5, -0.25)].into_iter().collect(),
            ..Default::default()
        };
        let model = ImageModel::from_params(&params).unwrap();
        let size = ImageSize::new(6, 4);
        let values: Vec<f64> = (0..24).map(|i| ((i * 7) % 11) as f64 / 10.0).collect();
        let truth = ImageData::from_flat(&values, size, 1).unwrap();
        let observations = model
            .generate_observations(&truth, 2)
            .unwrap()
            .into_iter()
            .map(|lr| lr.resized(size, Interpolation::Nearest).unwrap())
            .collect();
        (model, observations, truth)
    }

    #[test]
    fn ground_truth_has_zero_cost() {
        let (model, observations, truth) = setup();
        let term = DataTerm::new(&model, &observations, truth.size(), 1).unwrap();
        let cost = term.compute(&truth.to_flat(), None).unwrap();
        assert_abs_diff_eq!(cost, 0.0, epsilon = 1e-20);
    }

    #[test]
    fn cost_is_the_low_resolution_sum_of_squares() {
        let (model, observations, truth) = setup();
        let term = DataTerm::new(&model, &observations, truth.size(), 1).unwrap();
        let shifted: Vec<f64> = truth.to_flat().iter().map(|v| v + 0.1).collect();
        let mut expected = 0.0;
        for (k, obs) in observations.iter().enumerate() {
            let mut estimate = ImageData::from_flat(&shifted, truth.size(), 1).unwrap();
            model.apply_linear(&mut estimate, k).unwrap();
            let lr_obs = obs.resized(estimate.size(), Interpolation::Nearest).unwrap();
            for (a, b) in estimate.to_flat().iter().zip(lr_obs.to_flat()) {
                expected += (a - b).powi(2);
            }
        }
        let cost = term.compute(&shifted, None).unwrap();
        assert_abs_diff_eq!(cost, expected, epsilon = 1e-12);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let (model, observations, truth) = setup();
        let term = DataTerm::new(&model, &observations, truth.size(), 1).unwrap();
        let x: Vec<f64> = (0..24).map(|i| (i % 5) as f64 * 0.2).collect();
        let mut gradient = vec![0.0; x.len()];
        term.compute(&x, Some(&mut gradient)).unwrap();
        let h = 1e-6;
        for i in 0..x.len() {
            let mut plus = x.clone();
            let mut minus = x.clone();
            plus[i] += h;
            minus[i] -= h;
            let numeric = (term.compute(&plus, None).unwrap()
                - term.compute(&minus, None).unwrap())
                / (2.0 * h);
            assert_abs_diff_eq!(gradient[i], numeric, epsilon = 1e-5);
        }
    }

    #[test]
    fn mismatched_observations_are_rejected() {
        let (model, observations, _) = setup();
        let err = DataTerm::new(&model, &observations, ImageSize::new(4, 4), 1).err();
        assert!(matches!(err, Some(Error::ObservationMismatch { index: 0, .. })));
    }
}
