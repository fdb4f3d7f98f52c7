use super::plane::{ImagePlane, ImageSize};
use super::report::ImageDataReport;
use super::resize::{self, Interpolation};
use crate::error::{Error, Result};
use log::warn;

/// Multi-channel image: an ordered list of equally sized `f64` planes.
///
/// Pixel values are nominally in `[0, 1]` but nothing clamps them; use
/// [`ImageData::report`] to find out-of-range content. Channels are addressed
/// by index, pixels either by linear row-major index or by `(row, col)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageData {
    size: ImageSize,
    channels: Vec<ImagePlane>,
}

impl ImageData {
    /// Empty image without channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of planes, all of which must share one size.
    pub fn from_planes(planes: Vec<ImagePlane>) -> Result<Self> {
        let mut image = Self::new();
        for plane in planes {
            image.add_channel(plane)?;
        }
        Ok(image)
    }

    /// Image with `num_channels` zero planes of the given size.
    pub fn zeros(size: ImageSize, num_channels: usize) -> Self {
        Self {
            size,
            channels: vec![ImagePlane::zeros(size); num_channels],
        }
    }

    /// Build from a channel-major buffer: channel 0 row by row, then channel 1.
    pub fn from_flat(values: &[f64], size: ImageSize, num_channels: usize) -> Result<Self> {
        let per_channel = size.num_pixels();
        let expected = per_channel * num_channels;
        if values.len() != expected {
            return Err(Error::DimensionMismatch {
                what: "flat image buffer",
                expected,
                found: values.len(),
            });
        }
        let channels = if per_channel == 0 {
            vec![ImagePlane::zeros(size); num_channels]
        } else {
            values
                .chunks_exact(per_channel)
                .map(|chunk| ImagePlane::from_vec(size.width, size.height, chunk.to_vec()))
                .collect::<Result<Vec<_>>>()?
        };
        Ok(Self { size, channels })
    }

    /// Append a channel. The first channel fixes the image size.
    pub fn add_channel(&mut self, plane: ImagePlane) -> Result<()> {
        if self.channels.is_empty() {
            self.size = plane.size();
        } else if plane.size() != self.size {
            return Err(Error::ChannelSizeMismatch {
                expected: self.size,
                found: plane.size(),
            });
        }
        self.channels.push(plane);
        Ok(())
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Pixels per channel.
    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.size.num_pixels()
    }

    /// Pixels across all channels; the length of [`ImageData::to_flat`].
    #[inline]
    pub fn num_data_points(&self) -> usize {
        self.num_pixels() * self.num_channels()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() || self.size.is_empty()
    }

    pub fn channels(&self) -> &[ImagePlane] {
        &self.channels
    }

    pub fn channel(&self, channel: usize) -> Result<&ImagePlane> {
        self.channels.get(channel).ok_or(Error::IndexOutOfBounds {
            what: "channel",
            index: channel,
            len: self.channels.len(),
        })
    }

    pub fn channel_mut(&mut self, channel: usize) -> Result<&mut ImagePlane> {
        let len = self.channels.len();
        self.channels.get_mut(channel).ok_or(Error::IndexOutOfBounds {
            what: "channel",
            index: channel,
            len,
        })
    }

    pub fn channel_data(&self, channel: usize) -> Result<&[f64]> {
        self.channel(channel).map(ImagePlane::data)
    }

    pub fn channel_data_mut(&mut self, channel: usize) -> Result<&mut [f64]> {
        self.channel_mut(channel).map(ImagePlane::data_mut)
    }

    /// Value at a linear (row-major) pixel index.
    pub fn pixel(&self, channel: usize, index: usize) -> Result<f64> {
        let data = self.channel_data(channel)?;
        data.get(index).copied().ok_or(Error::IndexOutOfBounds {
            what: "pixel",
            index,
            len: data.len(),
        })
    }

    pub fn pixel_at(&self, channel: usize, row: usize, col: usize) -> Result<f64> {
        if row >= self.size.height {
            return Err(Error::IndexOutOfBounds {
                what: "row",
                index: row,
                len: self.size.height,
            });
        }
        if col >= self.size.width {
            return Err(Error::IndexOutOfBounds {
                what: "column",
                index: col,
                len: self.size.width,
            });
        }
        self.pixel(channel, row * self.size.width + col)
    }

    /// Resample every channel to `size`.
    pub fn resize(&mut self, size: ImageSize, interpolation: Interpolation) -> Result<()> {
        if self.is_empty() {
            return Err(Error::invalid("image", "cannot resize an empty image"));
        }
        if size.is_empty() {
            return Err(Error::invalid(
                "size",
                format!("target size {size} has a zero dimension"),
            ));
        }
        for plane in &mut self.channels {
            *plane = resize::resize_plane(plane, size, interpolation);
        }
        self.size = size;
        Ok(())
    }

    /// Resample every channel by a scale factor; dimensions are rounded.
    pub fn resize_by(&mut self, scale: f64, interpolation: Interpolation) -> Result<()> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::invalid(
                "scale",
                format!("resize factor must be positive, got {scale}"),
            ));
        }
        let size = ImageSize::new(
            (self.size.width as f64 * scale).round() as usize,
            (self.size.height as f64 * scale).round() as usize,
        );
        self.resize(size, interpolation)
    }

    /// Copy of this image resampled to `size`.
    pub fn resized(&self, size: ImageSize, interpolation: Interpolation) -> Result<Self> {
        let mut out = self.clone();
        out.resize(size, interpolation)?;
        Ok(out)
    }

    /// Enlarge by `scale`, placing pixel `(r, c)` at `(r * scale, c * scale)`
    /// and zero everywhere else.
    pub fn upsample_zero_padded(&mut self, scale: usize) -> Result<()> {
        if scale == 0 {
            return Err(Error::invalid("scale", "upsampling factor must be >= 1"));
        }
        if scale == 1 {
            return Ok(());
        }
        for plane in &mut self.channels {
            *plane = resize::upsample_zero_padded(plane, scale);
        }
        self.size = self.size.scaled_up(scale);
        Ok(())
    }

    /// Keep every `scale`-th row and column starting from `(0, 0)`.
    pub fn decimate(&mut self, scale: usize) -> Result<()> {
        if scale == 0 {
            return Err(Error::invalid("scale", "downsampling factor must be >= 1"));
        }
        if scale == 1 {
            return Ok(());
        }
        for plane in &mut self.channels {
            *plane = resize::decimate(plane, scale);
        }
        self.size = self.size.scaled_down(scale);
        Ok(())
    }

    /// Channel-major copy of every pixel.
    pub fn to_flat(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.num_data_points());
        for plane in &self.channels {
            out.extend_from_slice(plane.data());
        }
        out
    }

    /// Apply `f` to every pixel of every channel.
    pub fn map_in_place(&mut self, mut f: impl FnMut(f64) -> f64) {
        for plane in &mut self.channels {
            for v in plane.data_mut() {
                *v = f(*v);
            }
        }
    }

    /// Displayable version of the image.
    ///
    /// Three or more channels produce an RGB-like image from the first,
    /// middle and last channels; one or two channels produce the first
    /// channel alone. Returns `None` for an image without channels.
    pub fn visualization(&self) -> Option<ImageData> {
        let n = self.channels.len();
        if n == 0 {
            warn!("visualization requested for an image with no channels");
            return None;
        }
        let picks: Vec<usize> = if n >= 3 { vec![0, n / 2, n - 1] } else { vec![0] };
        Some(Self {
            size: self.size,
            channels: picks.into_iter().map(|c| self.channels[c].clone()).collect(),
        })
    }

    /// Summary of value ranges and out-of-range pixels.
    pub fn report(&self) -> ImageDataReport {
        ImageDataReport::from_image(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_channel() -> ImageData {
        let values: Vec<f64> = (0..12).map(|v| v as f64 / 10.0).collect();
        ImageData::from_flat(&values, ImageSize::new(3, 2), 2).unwrap()
    }

    #[test]
    fn flat_layout_is_channel_major() {
        let image = two_channel();
        assert_eq!(image.num_channels(), 2);
        assert_eq!(image.num_data_points(), 12);
        assert_eq!(image.pixel(1, 0).unwrap(), 0.6);
        assert_eq!(image.pixel_at(0, 1, 2).unwrap(), 0.5);
        assert_eq!(image.to_flat().len(), 12);
    }

    #[test]
    fn out_of_range_access_is_rejected() {
        let image = two_channel();
        assert!(matches!(
            image.pixel(2, 0),
            Err(Error::IndexOutOfBounds { what: "channel", .. })
        ));
        assert!(matches!(
            image.pixel(0, 6),
            Err(Error::IndexOutOfBounds { what: "pixel", .. })
        ));
        assert!(image.pixel_at(0, 2, 0).is_err());
    }

    #[test]
    fn add_channel_checks_size() {
        let mut image = ImageData::new();
        image.add_channel(ImagePlane::new(4, 4)).unwrap();
        let err = image.add_channel(ImagePlane::new(2, 2)).unwrap_err();
        assert!(matches!(err, Error::ChannelSizeMismatch { .. }));
        assert_eq!(image.num_channels(), 1);
    }

    #[test]
    fn clones_do_not_share_pixels() {
        let image = two_channel();
        let mut copy = image.clone();
        copy.channel_data_mut(0).unwrap()[0] = 9.0;
        assert_eq!(image.pixel(0, 0).unwrap(), 0.0);
        assert_eq!(copy.pixel(0, 0).unwrap(), 9.0);
    }

    #[test]
    fn visualization_picks_first_middle_last() {
        let planes = (0..5)
            .map(|c| ImagePlane::filled(2, 2, c as f64))
            .collect();
        let image = ImageData::from_planes(planes).unwrap();
        let vis = image.visualization().unwrap();
        assert_eq!(vis.num_channels(), 3);
        assert_eq!(vis.pixel(0, 0).unwrap(), 0.0);
        assert_eq!(vis.pixel(1, 0).unwrap(), 2.0);
        assert_eq!(vis.pixel(2, 0).unwrap(), 4.0);
        assert_eq!(image.num_channels(), 5);
        assert!(ImageData::new().visualization().is_none());
    }

    #[test]
    fn resizing_an_empty_image_fails() {
        let mut empty = ImageData::new();
        assert!(empty.resize(ImageSize::new(2, 2), Interpolation::Nearest).is_err());
        let mut image = two_channel();
        assert!(image.resize(ImageSize::new(0, 2), Interpolation::Linear).is_err());
        image.resize_by(2.0, Interpolation::Nearest).unwrap();
        assert_eq!(image.size(), ImageSize::new(6, 4));
    }
}
