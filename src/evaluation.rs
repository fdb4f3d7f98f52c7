//! Reconstruction quality against a known ground truth.
use crate::error::{Error, Result};
use crate::image::ImageData;

/// Peak value of the nominal `[0, 1]` intensity range.
const MAX_PIXEL_VALUE: f64 = 1.0;

/// Mean squared error over every channel and pixel.
pub fn mean_squared_error(reference: &ImageData, image: &ImageData) -> Result<f64> {
    if reference.size() != image.size() || reference.num_channels() != image.num_channels() {
        return Err(Error::ObservationMismatch {
            index: 0,
            expected: format!(
                "{} x {} channels",
                reference.size(),
                reference.num_channels()
            ),
            found: format!("{} x {} channels", image.size(), image.num_channels()),
        });
    }
    let n = reference.num_data_points();
    if n == 0 {
        return Err(Error::invalid("image", "cannot compare empty images"));
    }
    let mut sum = 0.0;
    for (a, b) in reference.channels().iter().zip(image.channels()) {
        sum += a
            .data()
            .iter()
            .zip(b.data())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>();
    }
    Ok(sum / n as f64)
}

/// Peak signal-to-noise ratio in dB with a peak of 1.0. Identical images
/// yield `f64::INFINITY`.
pub fn psnr(reference: &ImageData, image: &ImageData) -> Result<f64> {
    let mse = mean_squared_error(reference, image)?;
    Ok(20.0 * MAX_PIXEL_VALUE.log10() - 10.0 * mse.log10())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ImagePlane, ImageSize};
    use approx::assert_relative_eq;

    fn ground_truth() -> ImageData {
        let plane = ImagePlane::from_rows(&[
            [0.0, 0.1, 0.2, 0.3],
            [0.7, 0.6, 0.5, 0.4],
            [0.8, 0.9, 1.0, 0.5],
            [0.4, 0.6, 0.0, 1.0],
        ])
        .unwrap();
        ImageData::from_planes(vec![plane]).unwrap()
    }

    #[test]
    fn identical_images_have_infinite_psnr() {
        let truth = ground_truth();
        assert_eq!(psnr(&truth, &truth.clone()).unwrap(), f64::INFINITY);
    }

    #[test]
    fn small_difference_gives_known_psnr() {
        let truth = ground_truth();
        let mut image = truth.clone();
        let data = image.channel_data_mut(0).unwrap();
        data[6] = 0.25;
        data[15] = 0.5;
        assert_relative_eq!(
            mean_squared_error(&truth, &image).unwrap(),
            0.01953125,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            psnr(&truth, &image).unwrap(),
            17.09269960975831,
            max_relative = 1e-12
        );
    }

    #[test]
    fn mismatched_images_are_rejected() {
        let truth = ground_truth();
        let other = ImageData::zeros(ImageSize::new(4, 4), 2);
        assert!(psnr(&truth, &other).is_err());
    }
}
