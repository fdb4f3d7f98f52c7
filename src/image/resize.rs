//! Plane resampling used by [`ImageData::resize`](super::ImageData::resize).
//!
//! - `Nearest`: picks source index `floor(dst * src_len / dst_len)`. Integer
//!   upsampling replicates each pixel into an `s × s` block and integer
//!   downsampling picks `(row * s, col * s)`, so the two are consistent with
//!   the strided decimation of the forward model.
//! - `Linear`: bilinear with half-pixel centres and clamped borders.
//! - `Area`: box average over the covered source region when shrinking;
//!   enlarging falls back to bilinear.
use super::plane::{ImagePlane, ImageSize};
use super::traits::{ImageView, ImageViewMut};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    #[default]
    Nearest,
    Linear,
    Area,
}

pub(crate) fn resize_plane(
    src: &ImagePlane,
    size: ImageSize,
    interpolation: Interpolation,
) -> ImagePlane {
    if src.size() == size {
        return src.clone();
    }
    match interpolation {
        Interpolation::Nearest => resize_nearest(src, size),
        Interpolation::Linear => resize_linear(src, size),
        Interpolation::Area => {
            if size.width > src.width() || size.height > src.height() {
                resize_linear(src, size)
            } else {
                resize_area(src, size)
            }
        }
    }
}

fn resize_nearest(src: &ImagePlane, size: ImageSize) -> ImagePlane {
    let mut dst = ImagePlane::zeros(size);
    let (sw, sh) = (src.width(), src.height());
    let columns: Vec<usize> = (0..size.width)
        .map(|x| ((x * sw) / size.width).min(sw - 1))
        .collect();
    for y in 0..size.height {
        let sy = ((y * sh) / size.height).min(sh - 1);
        let src_row = src.row(sy);
        let dst_row = dst.row_mut(y);
        for (dst_px, &sx) in dst_row.iter_mut().zip(&columns) {
            *dst_px = src_row[sx];
        }
    }
    dst
}

/// Source index pair and blend factor for one destination coordinate.
fn linear_tap(dst: usize, src_len: usize, dst_len: usize) -> (usize, usize, f64) {
    let scale = src_len as f64 / dst_len as f64;
    let pos = (dst as f64 + 0.5) * scale - 0.5;
    if pos <= 0.0 {
        return (0, 0, 0.0);
    }
    let i0 = pos.floor() as usize;
    if i0 + 1 >= src_len {
        return (src_len - 1, src_len - 1, 0.0);
    }
    (i0, i0 + 1, pos - i0 as f64)
}

fn resize_linear(src: &ImagePlane, size: ImageSize) -> ImagePlane {
    let mut dst = ImagePlane::zeros(size);
    let taps_x: Vec<_> = (0..size.width)
        .map(|x| linear_tap(x, src.width(), size.width))
        .collect();
    for y in 0..size.height {
        let (y0, y1, ty) = linear_tap(y, src.height(), size.height);
        let (r0, r1) = (src.row(y0), src.row(y1));
        let dst_row = dst.row_mut(y);
        for (dst_px, &(x0, x1, tx)) in dst_row.iter_mut().zip(&taps_x) {
            let top = r0[x0] * (1.0 - tx) + r0[x1] * tx;
            let bottom = r1[x0] * (1.0 - tx) + r1[x1] * tx;
            *dst_px = top * (1.0 - ty) + bottom * ty;
        }
    }
    dst
}

/// Fractional coverage of every source index by each destination cell.
fn area_weights(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f64)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = start + scale;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);
            (first..last)
                .filter_map(|s| {
                    let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                    (overlap > 1e-12).then_some((s, overlap / scale))
                })
                .collect()
        })
        .collect()
}

fn resize_area(src: &ImagePlane, size: ImageSize) -> ImagePlane {
    let mut dst = ImagePlane::zeros(size);
    let wx = area_weights(src.width(), size.width);
    let wy = area_weights(src.height(), size.height);
    for (y, row_weights) in wy.iter().enumerate() {
        for (x, col_weights) in wx.iter().enumerate() {
            let mut acc = 0.0;
            for &(sy, wyv) in row_weights {
                let src_row = src.row(sy);
                for &(sx, wxv) in col_weights {
                    acc += wyv * wxv * src_row[sx];
                }
            }
            dst.set(x, y, acc);
        }
    }
    dst
}

/// Place pixel `(r, c)` at `(r * s, c * s)` and zero everything else.
pub(crate) fn upsample_zero_padded(src: &ImagePlane, scale: usize) -> ImagePlane {
    let mut dst = ImagePlane::zeros(src.size().scaled_up(scale));
    for y in 0..src.height() {
        let src_row = src.row(y);
        let dst_row = dst.row_mut(y * scale);
        for (x, &v) in src_row.iter().enumerate() {
            dst_row[x * scale] = v;
        }
    }
    dst
}

/// Strided point sampling: output `(r, c)` takes input `(r * s, c * s)`.
pub(crate) fn decimate(src: &ImagePlane, scale: usize) -> ImagePlane {
    let size = src.size().scaled_down(scale);
    let mut dst = ImagePlane::zeros(size);
    for y in 0..size.height {
        let src_row = src.row(y * scale);
        let dst_row = dst.row_mut(y);
        for (x, dst_px) in dst_row.iter_mut().enumerate() {
            *dst_px = src_row[x * scale];
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp(w: usize, h: usize) -> ImagePlane {
        let data = (0..w * h).map(|i| i as f64).collect();
        ImagePlane::from_vec(w, h, data).unwrap()
    }

    #[test]
    fn nearest_upsampling_replicates_blocks() {
        let src = ImagePlane::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let up = resize_plane(&src, ImageSize::new(4, 4), Interpolation::Nearest);
        assert_eq!(up.row(0), &[1.0, 1.0, 2.0, 2.0]);
        assert_eq!(up.row(1), &[1.0, 1.0, 2.0, 2.0]);
        assert_eq!(up.row(3), &[3.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn nearest_downsampling_matches_decimation() {
        let src = ramp(6, 4);
        let nearest = resize_plane(&src, ImageSize::new(3, 2), Interpolation::Nearest);
        assert_eq!(nearest, decimate(&src, 2));
    }

    #[test]
    fn area_downsampling_averages_blocks() {
        let src = ImagePlane::from_rows(&[[0.0, 2.0], [4.0, 6.0]]).unwrap();
        let small = resize_plane(&src, ImageSize::new(1, 1), Interpolation::Area);
        assert_abs_diff_eq!(small.get(0, 0), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn linear_upsampling_keeps_constant_images_constant() {
        let src = ImagePlane::filled(3, 2, 0.25);
        let up = resize_plane(&src, ImageSize::new(7, 5), Interpolation::Linear);
        for &v in up.data() {
            assert_abs_diff_eq!(v, 0.25, epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_padded_upsampling_places_samples_on_the_stride() {
        let src = ImagePlane::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        let up = upsample_zero_padded(&src, 2);
        assert_eq!(up.size(), ImageSize::new(6, 4));
        assert_eq!(up.row(0), &[1.0, 0.0, 2.0, 0.0, 3.0, 0.0]);
        assert_eq!(up.row(1), &[0.0; 6]);
        assert_eq!(up.row(2), &[4.0, 0.0, 5.0, 0.0, 6.0, 0.0]);
        assert_eq!(decimate(&up, 2), src);
    }
}
