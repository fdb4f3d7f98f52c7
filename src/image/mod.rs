pub mod data;
pub mod plane;
pub mod report;
pub mod resize;
pub mod traits;

pub use self::data::ImageData;
pub use self::plane::{ImagePlane, ImageSize};
pub use self::report::ImageDataReport;
pub use self::resize::Interpolation;
pub use self::traits::{ImageView, ImageViewMut, Rows};
