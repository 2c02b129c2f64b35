use image::{GrayImage, Luma, RgbImage};
use tracing::debug;

use crate::algorithms::NormalizationParams;

/// ITU-R 601 luma, the conversion the classifier's training images went through.
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let luma = (r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000;
        Luma([luma as u8])
    })
}

/// Odd Gaussian kernel size scaled to image width: `width / divisor` clamped
/// to the configured bounds, bumped to the next odd value.
pub fn blur_kernel_size(width: u32, params: &NormalizationParams) -> u32 {
    let size = (width / params.blur_resolution_divisor.max(1))
        .clamp(params.min_blur_kernel, params.max_blur_kernel);
    if size % 2 == 0 {
        size + 1
    } else {
        size
    }
}

/// Sampled Gaussian taps for an odd `size`. Sizes up to 7 use the fixed
/// binomial-like tables, larger sizes derive sigma from the size.
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    match size {
        1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
        _ => {
            let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
            let half = (size / 2) as i32;
            let taps: Vec<f32> = (-half..=half)
                .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
                .collect();
            let total: f32 = taps.iter().sum();
            taps.into_iter().map(|t| t / total).collect()
        }
    }
}

/// Resolution-adaptive Gaussian smoothing.
pub fn denoise(gray: &GrayImage, params: &NormalizationParams) -> GrayImage {
    let size = blur_kernel_size(gray.width(), params);
    debug!(kernel_size = size, width = gray.width(), "Gaussian denoise");
    let kernel = gaussian_kernel(size);
    imageproc::filter::separable_filter_equal(gray, kernel.as_slice())
}

pub fn mean_intensity(gray: &GrayImage) -> f64 {
    let n = gray.as_raw().len();
    if n == 0 {
        return 0.0;
    }
    gray.as_raw().iter().map(|&v| v as u64).sum::<u64>() as f64 / n as f64
}

/// Whether the background is lighter than the digit, judged from the mean
/// of the blurred buffer.
pub fn is_light_background(blurred: &GrayImage, params: &NormalizationParams) -> bool {
    let mean = mean_intensity(blurred);
    let light = mean > params.polarity_threshold;
    debug!(mean, light_background = light, "Polarity detected");
    light
}
