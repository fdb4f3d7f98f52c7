use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use super_resolution::image::{ImageData, ImagePlane, ImageSize};

/// Generates a high-contrast checkerboard with values in `[0.1, 0.9]`.
///
/// Channel `c` is scaled by `1 / (c + 1)` so channels are distinguishable.
pub fn checkerboard(width: usize, height: usize, cell: usize, num_channels: usize) -> ImageData {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    assert!(cell > 0, "cell size must be positive");

    let mut image = ImageData::new();
    for c in 0..num_channels {
        let gain = 1.0 / (c as f64 + 1.0);
        let mut plane = ImagePlane::zeros(ImageSize::new(width, height));
        for y in 0..height {
            for x in 0..width {
                let sum = x / cell + y / cell;
                let val = if sum % 2 == 0 { 0.1 } else { 0.9 };
                plane.set(x, y, val * gain);
            }
        }
        image.add_channel(plane).unwrap();
    }
    image
}

/// Deterministic pseudo-random plane with values in `[0, 1)`.
pub fn random_plane(width: usize, height: usize, seed: u64) -> ImagePlane {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..width * height).map(|_| rng.gen::<f64>()).collect();
    ImagePlane::from_vec(width, height, data).unwrap()
}
