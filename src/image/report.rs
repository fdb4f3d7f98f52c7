use super::data::ImageData;
use super::plane::ImageSize;
use serde::{Deserialize, Serialize};

/// Value-range summary of an [`ImageData`].
///
/// Counts pixels that fall outside the nominal `[0, 1]` range, in total and
/// for the worst channel of each kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDataReport {
    pub size: ImageSize,
    pub num_channels: usize,
    pub num_negative_pixels: usize,
    pub num_over_one_pixels: usize,
    pub most_negative_channel: Option<usize>,
    pub most_negative_channel_count: usize,
    pub most_over_one_channel: Option<usize>,
    pub most_over_one_channel_count: usize,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl ImageDataReport {
    pub fn from_image(image: &ImageData) -> Self {
        let mut report = Self {
            size: image.size(),
            num_channels: image.num_channels(),
            ..Default::default()
        };
        for (c, plane) in image.channels().iter().enumerate() {
            let mut negative = 0usize;
            let mut over_one = 0usize;
            for &v in plane.data() {
                if v < 0.0 {
                    negative += 1;
                }
                if v > 1.0 {
                    over_one += 1;
                }
                report.min_value = Some(report.min_value.map_or(v, |m| m.min(v)));
                report.max_value = Some(report.max_value.map_or(v, |m| m.max(v)));
            }
            report.num_negative_pixels += negative;
            report.num_over_one_pixels += over_one;
            if negative > report.most_negative_channel_count {
                report.most_negative_channel = Some(c);
                report.most_negative_channel_count = negative;
            }
            if over_one > report.most_over_one_channel_count {
                report.most_over_one_channel = Some(c);
                report.most_over_one_channel_count = over_one;
            }
        }
        report
    }

    /// True when every pixel lies in `[0, 1]`.
    pub fn is_in_range(&self) -> bool {
        self.num_negative_pixels == 0 && self.num_over_one_pixels == 0
    }
}
