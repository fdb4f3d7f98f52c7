//! Forward imaging model: degradation operators and their ordered chain.
pub mod blur;
pub mod downsampling;
pub mod filters;
pub mod image_model;
pub mod motion;
pub mod noise;
pub mod operator;

pub use self::blur::BlurOperator;
pub use self::downsampling::DownsamplingOperator;
pub use self::filters::{GaussianFilter, SeparableFilter};
pub use self::image_model::{ImageModel, ImageModelParams};
pub use self::motion::MotionOperator;
pub use self::noise::AdditiveNoiseOperator;
pub use self::operator::{apply_matrix, DegradationOperator, MAX_OPERATOR_MATRIX_PIXELS};
