use super::blur::BlurOperator;
use super::downsampling::DownsamplingOperator;
use super::motion::MotionOperator;
use super::noise::AdditiveNoiseOperator;
use super::operator::DegradationOperator;
use crate::error::{Error, Result};
use crate::image::{ImageData, ImageSize};
use crate::motion::MotionShiftSequence;
use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Parameters of the standard motion → blur → downsampling → noise model.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageModelParams {
    /// Integer resolution ratio between the estimate and the observations.
    pub scale: usize,
    /// Gaussian kernel size in taps; together with a zero sigma, 0 disables
    /// the blur stage.
    pub blur_radius: usize,
    /// Gaussian standard deviation.
    pub blur_sigma: f64,
    /// Per-frame shifts; an empty sequence disables the motion stage.
    pub motion: MotionShiftSequence,
    /// Noise standard deviation; values <= 0 disable the noise stage.
    pub noise_sigma: f64,
    pub noise_seed: Option<u64>,
}

impl Default for ImageModelParams {
    fn default() -> Self {
        Self {
            scale: 2,
            blur_radius: 3,
            blur_sigma: 1.0,
            motion: MotionShiftSequence::default(),
            noise_sigma: 0.0,
            noise_seed: None,
        }
    }
}

/// Ordered chain of degradation operators mapping a high-resolution image to
/// one low-resolution observation.
///
/// Operators run in insertion order in the forward direction and in reverse
/// order in the transpose direction. Stochastic operators are skipped by
/// [`ImageModel::apply_linear`] and [`ImageModel::apply_transpose`].
#[derive(Debug, Default)]
pub struct ImageModel {
    operators: Vec<Box<dyn DegradationOperator>>,
}

impl ImageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard model built from `params`, skipping disabled stages.
    ///
    /// Blur is disabled only when both its size and sigma are zero; any other
    /// invalid pair is an error.
    pub fn from_params(params: &ImageModelParams) -> Result<Self> {
        let mut model = Self::new();
        if !params.motion.is_empty() {
            model.add_operator(Box::new(MotionOperator::new(params.motion.clone())))?;
        }
        if params.blur_radius != 0 || params.blur_sigma != 0.0 {
            model.add_operator(Box::new(BlurOperator::new(
                params.blur_radius,
                params.blur_sigma,
            )?))?;
        }
        model.add_operator(Box::new(DownsamplingOperator::new(params.scale)?))?;
        if params.noise_sigma > 0.0 {
            model.add_operator(Box::new(
                AdditiveNoiseOperator::new(params.noise_sigma)?.with_seed(params.noise_seed),
            ))?;
        }
        Ok(model)
    }

    /// Append an operator. Only one downsampling operator is allowed.
    pub fn add_operator(&mut self, operator: Box<dyn DegradationOperator>) -> Result<()> {
        if operator.downsampling_scale().is_some() {
            if let Some(existing) = self.operators.iter().find_map(|op| op.downsampling_scale()) {
                return Err(Error::DuplicateDownsampling { existing });
            }
        }
        debug!("image model: appending {} operator", operator.name());
        self.operators.push(operator);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn operators(&self) -> &[Box<dyn DegradationOperator>] {
        &self.operators
    }

    /// Resolution ratio of the single downsampling operator.
    pub fn downsampling_scale(&self) -> Result<usize> {
        self.operators
            .iter()
            .find_map(|op| op.downsampling_scale())
            .ok_or(Error::MissingDownsampling)
    }

    /// Smallest per-frame parameter count across operators, if any has one.
    pub fn num_frames(&self) -> Option<usize> {
        self.operators.iter().filter_map(|op| op.num_frames()).min()
    }

    /// Observation size produced from a high-resolution image of `hr`.
    pub fn lr_size(&self, hr: ImageSize) -> ImageSize {
        self.operators
            .iter()
            .fold(hr, |size, op| op.output_size(size))
    }

    /// Run every operator forward, noise included.
    pub fn apply(&self, image: &mut ImageData, index: usize) -> Result<()> {
        for op in &self.operators {
            op.apply(image, index)?;
        }
        Ok(())
    }

    /// Run the deterministic operators forward.
    pub fn apply_linear(&self, image: &mut ImageData, index: usize) -> Result<()> {
        for op in self.operators.iter().filter(|op| !op.is_stochastic()) {
            op.apply(image, index)?;
        }
        Ok(())
    }

    /// Run the deterministic operators' transposes in reverse order.
    pub fn apply_transpose(&self, image: &mut ImageData, index: usize) -> Result<()> {
        for op in self.operators.iter().rev().filter(|op| !op.is_stochastic()) {
            op.apply_transpose(image, index)?;
        }
        Ok(())
    }

    /// Product of all operator matrices for a single channel of `size`.
    ///
    /// The first operator applied is the rightmost factor.
    pub fn model_matrix(&self, size: ImageSize, index: usize) -> Result<DMatrix<f64>> {
        let mut ops = self.operators.iter();
        let first = ops
            .next()
            .ok_or_else(|| Error::invalid("image_model", "model has no operators"))?;
        let mut matrix = first.operator_matrix(size, index)?;
        let mut current = first.output_size(size);
        for op in ops {
            matrix = op.operator_matrix(current, index)? * matrix;
            current = op.output_size(current);
        }
        Ok(matrix)
    }

    /// Degrade `hr` once per frame `0..count`.
    pub fn generate_observations(&self, hr: &ImageData, count: usize) -> Result<Vec<ImageData>> {
        if let Some(frames) = self.num_frames() {
            if count > frames {
                return Err(Error::MotionSequenceTooShort {
                    available: frames,
                    required: count,
                });
            }
        }
        (0..count)
            .map(|index| {
                let mut lr = hr.clone();
                self.apply(&mut lr, index)?;
                Ok(lr)
            })
            .collect()
    }
}
