//! Image priors expressed as per-pixel residuals.
//!
//! A regularizer maps a channel-major parameter vector to one non-negative
//! residual per data point. The IRLS term squares and weights those
//! residuals, so every regularizer also reports the gradient of
//! `sum_i c_i * r_i(x)^2` for caller-supplied constants `c`.
pub mod btv;
pub mod tv;

pub use self::btv::BilateralTotalVariation;
pub use self::tv::{TotalVariation, TvNorm};

use crate::error::{Error, Result};
use crate::image::ImageSize;
use serde::{Deserialize, Serialize};
use std::fmt;

pub trait Regularizer: fmt::Debug {
    fn name(&self) -> &'static str;

    fn image_size(&self) -> ImageSize;

    fn num_channels(&self) -> usize;

    /// Rebind the regularizer to a different image layout.
    fn set_image_dimensions(&mut self, size: ImageSize, num_channels: usize);

    fn num_parameters(&self) -> usize {
        self.image_size().num_pixels() * self.num_channels()
    }

    /// One residual per data point.
    fn apply(&self, x: &[f64]) -> Result<Vec<f64>>;

    /// Residuals plus the gradient of `sum_i constants[i] * r_i(x)^2`.
    fn apply_with_gradient(
        &self,
        x: &[f64],
        constants: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>)>;
}

pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(Error::DimensionMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

/// Subgradient sign with `sign(0) = 0`.
#[inline]
pub(crate) fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Regularizer selection as read from run configuration files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegularizerConfig {
    TotalVariation {
        #[serde(default = "default_lambda")]
        lambda: f64,
        #[serde(default)]
        norm: TvNorm,
        #[serde(default)]
        three_d: bool,
    },
    BilateralTotalVariation {
        #[serde(default = "default_lambda")]
        lambda: f64,
        #[serde(default = "default_scale_range")]
        scale_range: usize,
        #[serde(default = "default_spatial_decay")]
        spatial_decay: f64,
    },
}

fn default_lambda() -> f64 {
    0.01
}

fn default_scale_range() -> usize {
    3
}

fn default_spatial_decay() -> f64 {
    0.5
}

impl Default for RegularizerConfig {
    fn default() -> Self {
        RegularizerConfig::TotalVariation {
            lambda: default_lambda(),
            norm: TvNorm::default(),
            three_d: false,
        }
    }
}

impl RegularizerConfig {
    pub fn lambda(&self) -> f64 {
        match self {
            RegularizerConfig::TotalVariation { lambda, .. }
            | RegularizerConfig::BilateralTotalVariation { lambda, .. } => *lambda,
        }
    }

    pub fn build(&self, size: ImageSize, num_channels: usize) -> Result<Box<dyn Regularizer>> {
        Ok(match *self {
            RegularizerConfig::TotalVariation { norm, three_d, .. } => Box::new(
                TotalVariation::new(size, num_channels)
                    .with_norm(norm)
                    .with_3d(three_d),
            ),
            RegularizerConfig::BilateralTotalVariation {
                scale_range,
                spatial_decay,
                ..
            } => Box::new(BilateralTotalVariation::new(
                size,
                num_channels,
                scale_range,
                spatial_decay,
            )?),
        })
    }
}
