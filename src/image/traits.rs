//! Row-oriented access to single-channel f64 planes.
//!
//! Filters and resamplers are written against these traits so they work on
//! any row-major buffer, not only [`ImagePlane`](super::ImagePlane).
use super::plane::ImageSize;

pub trait ImageView {
    fn size(&self) -> ImageSize;

    fn row(&self, y: usize) -> &[f64];

    #[inline]
    fn width(&self) -> usize {
        self.size().width
    }

    #[inline]
    fn height(&self) -> usize {
        self.size().height
    }

    /// Sample at signed coordinates; zero outside the canvas.
    #[inline]
    fn sample_or_zero(&self, x: isize, y: isize) -> f64 {
        let size = self.size();
        if x < 0 || y < 0 || x as usize >= size.width || y as usize >= size.height {
            0.0
        } else {
            self.row(y as usize)[x as usize]
        }
    }

    fn rows(&self) -> Rows<'_, Self>
    where
        Self: Sized,
    {
        Rows { image: self, y: 0 }
    }
}

pub trait ImageViewMut: ImageView {
    fn row_mut(&mut self, y: usize) -> &mut [f64];
}

pub struct Rows<'a, I: ?Sized + ImageView> {
    image: &'a I,
    y: usize,
}

impl<'a, I: ImageView> Iterator for Rows<'a, I> {
    type Item = &'a [f64];

    fn next(&mut self) -> Option<Self::Item> {
        if self.y >= self.image.height() {
            return None;
        }
        let y = self.y;
        self.y += 1;
        Some(self.image.row(y))
    }
}
