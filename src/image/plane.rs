//! Owned single-band f64 plane in row-major layout (stride == width).
//!
//! One plane holds one channel of an [`ImageData`](super::ImageData). Values
//! are linear intensities, nominally in `[0, 1]`.
use super::traits::{ImageView, ImageViewMut};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and height of an image in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: usize,
    pub height: usize,
}

impl ImageSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Number of pixels in one channel.
    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Size after enlarging both axes by an integer factor.
    pub fn scaled_up(&self, scale: usize) -> Self {
        Self::new(self.width * scale, self.height * scale)
    }

    /// Size after strided decimation by an integer factor.
    pub fn scaled_down(&self, scale: usize) -> Self {
        let scale = scale.max(1);
        Self::new(self.width / scale, self.height / scale)
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImagePlane {
    w: usize,
    h: usize,
    data: Vec<f64>,
}

impl ImagePlane {
    /// Construct a zero-initialized plane of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self::filled(w, h, 0.0)
    }

    pub fn filled(w: usize, h: usize, value: f64) -> Self {
        Self {
            w,
            h,
            data: vec![value; w * h],
        }
    }

    pub fn zeros(size: ImageSize) -> Self {
        Self::new(size.width, size.height)
    }

    /// Wrap an existing row-major buffer. The buffer length must be `w * h`.
    pub fn from_vec(w: usize, h: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != w * h {
            return Err(Error::DimensionMismatch {
                what: "plane buffer",
                expected: w * h,
                found: data.len(),
            });
        }
        Ok(Self { w, h, data })
    }

    /// Build a plane from nested rows; every row must have the same length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let h = rows.len();
        let w = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(w * h);
        for row in rows {
            let row = row.as_ref();
            if row.len() != w {
                return Err(Error::DimensionMismatch {
                    what: "plane row",
                    expected: w,
                    found: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { w, h, data })
    }

    #[inline]
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.w, self.h)
    }

    #[inline]
    /// Convert (x, y) to a linear index into the buffer.
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.w + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f64) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Sum of all pixel values.
    pub fn sum(&self) -> f64 {
        self.rows().map(|r| r.iter().sum::<f64>()).sum()
    }
}

impl ImageView for ImagePlane {
    #[inline]
    fn size(&self) -> ImageSize {
        ImageSize::new(self.w, self.h)
    }
    #[inline]
    fn row(&self, y: usize) -> &[f64] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }
}

impl ImageViewMut for ImagePlane {
    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [f64] {
        let start = y * self.w;
        let end = start + self.w;
        &mut self.data[start..end]
    }
}
