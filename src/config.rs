//! JSON configuration of the synthetic super-resolution demo.
//!
//! Every section is optional; missing fields fall back to their `Default`.
//!
//! ```json
//! {
//!   "pattern": { "kind": "checkerboard", "width": 32, "height": 32, "cell": 4 },
//!   "model": { "scale": 2, "blur_radius": 3, "blur_sigma": 0.8,
//!              "motion": [{"dx": 0, "dy": 0}, {"dx": -1, "dy": 0}] },
//!   "num_frames": 2,
//!   "solver": { "max_irls_iterations": 10 },
//!   "regularizers": [{ "type": "total_variation", "lambda": 0.01 }],
//!   "output": { "report_json": "report.json" }
//! }
//! ```
use crate::error::{Error, Result};
use crate::image::{ImageData, ImagePlane, ImageSize, Interpolation};
use crate::model::ImageModelParams;
use crate::regularizer::RegularizerConfig;
use crate::solver::IrlsSolverOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticRunConfig {
    pub pattern: PatternConfig,
    pub model: ImageModelParams,
    /// Frames to generate; defaults to the motion sequence length (or 1).
    pub num_frames: Option<usize>,
    /// Text file of `dx dy` lines replacing `model.motion` when set.
    pub motion_file: Option<PathBuf>,
    pub solver: IrlsSolverOptions,
    pub regularizers: Vec<RegularizerConfig>,
    pub initial_estimate: InitialEstimate,
    pub output: OutputConfig,
}

impl SyntheticRunConfig {
    pub fn frame_count(&self) -> usize {
        self.num_frames
            .unwrap_or_else(|| self.model.motion.len().max(1))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    #[default]
    Checkerboard,
    /// Diagonal ramp from 0 at the top-left to 1 at the bottom-right.
    Ramp,
    /// Concentric rings, useful for judging aliasing.
    Rings,
}

/// Ground-truth image rendered by the demo.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub kind: PatternKind,
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    /// Checkerboard cell size or ring period, in pixels.
    pub cell: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            kind: PatternKind::Checkerboard,
            width: 32,
            height: 32,
            channels: 1,
            cell: 4,
        }
    }
}

impl PatternConfig {
    /// Render the pattern; channel `c` is dimmed by `1 / (c + 1)` so channels
    /// differ.
    pub fn render(&self) -> Result<ImageData> {
        let size = ImageSize::new(self.width, self.height);
        if size.is_empty() || self.channels == 0 {
            return Err(Error::invalid(
                "pattern",
                format!("{size} with {} channels has no pixels", self.channels),
            ));
        }
        let cell = self.cell.max(1);
        let mut image = ImageData::new();
        for c in 0..self.channels {
            let gain = 1.0 / (c as f64 + 1.0);
            let mut plane = ImagePlane::zeros(size);
            for y in 0..size.height {
                for x in 0..size.width {
                    let v = match self.kind {
                        PatternKind::Checkerboard => {
                            if ((x / cell) + (y / cell)) % 2 == 0 {
                                0.15
                            } else {
                                0.85
                            }
                        }
                        PatternKind::Ramp => {
                            (x + y) as f64 / ((size.width + size.height - 2).max(1)) as f64
                        }
                        PatternKind::Rings => {
                            let dx = x as f64 - size.width as f64 / 2.0;
                            let dy = y as f64 - size.height as f64 / 2.0;
                            let r = (dx * dx + dy * dy).sqrt();
                            0.5 + 0.5 * (std::f64::consts::TAU * r / cell as f64).cos()
                        }
                    };
                    plane.set(x, y, v * gain);
                }
            }
            image.add_channel(plane)?;
        }
        Ok(image)
    }
}

/// Starting point handed to the solver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InitialEstimate {
    /// All-zero image.
    Zeros,
    /// First observation resampled to the high-resolution size.
    #[default]
    UpsampledFirst,
    /// Constant image.
    Constant { value: f64 },
}

impl InitialEstimate {
    pub fn build(
        &self,
        observations: &[ImageData],
        hr_size: ImageSize,
        interpolation: Interpolation,
    ) -> Result<ImageData> {
        let first = observations.first().ok_or(Error::EmptyObservations)?;
        let channels = first.num_channels();
        match *self {
            InitialEstimate::Zeros => Ok(ImageData::zeros(hr_size, channels)),
            InitialEstimate::Constant { value } => {
                let mut image = ImageData::zeros(hr_size, channels);
                image.map_in_place(|_| value);
                Ok(image)
            }
            InitialEstimate::UpsampledFirst => first.resized(hr_size, interpolation),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where to write the JSON `SolveReport`.
    pub report_json: Option<PathBuf>,
    /// Where to save the motion sequence actually used.
    pub motion_file: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<SyntheticRunConfig> {
    let data = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| Error::Config {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: SyntheticRunConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.pattern.width, 32);
        assert_eq!(config.model.scale, 2);
        assert_eq!(config.frame_count(), 1);
        assert!(config.regularizers.is_empty());
        assert_eq!(config.initial_estimate, InitialEstimate::UpsampledFirst);
    }

    #[test]
    fn motion_and_regularizers_parse() {
        let json = r#"{
            "model": {"scale": 3, "motion": [{"dx": 0.5, "dy": -1.0}, {"dx": 0, "dy": 0}]},
            "regularizers": [{"type": "bilateral_total_variation", "lambda": 0.2}],
            "initial_estimate": {"type": "constant", "value": 0.5}
        }"#;
        let config: SyntheticRunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.model.scale, 3);
        assert_eq!(config.model.motion.len(), 2);
        assert_eq!(config.frame_count(), 2);
        assert_eq!(config.regularizers[0].lambda(), 0.2);
        assert_eq!(
            config.initial_estimate,
            InitialEstimate::Constant { value: 0.5 }
        );
    }

    #[test]
    fn patterns_render_in_range() {
        for kind in [PatternKind::Checkerboard, PatternKind::Ramp, PatternKind::Rings] {
            let pattern = PatternConfig {
                kind,
                channels: 3,
                ..Default::default()
            };
            let image = pattern.render().unwrap();
            assert_eq!(image.num_channels(), 3);
            assert!(image.report().is_in_range(), "{kind:?}");
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config(Path::new("/nonexistent/sr_config.json")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
