use image::{imageops, GrayImage, Luma};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::NormalizationParams;

/// Resampling used to bring the digit to the target stroke size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleFilter {
    /// Area-weighted for both shrinking and enlarging.
    #[default]
    Area,
    /// Area-weighted when shrinking, bilinear when enlarging.
    AreaShrinkLinearEnlarge,
}

/// Output size for scaling `(w, h)` by `target / max(w, h)`. Each side is
/// floored and kept at least one pixel, so the longer side is exactly `target`.
pub fn target_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    let longest = width.max(height).max(1) as u64;
    let scaled = |side: u32| ((side as u64 * target as u64 / longest) as u32).max(1);
    (scaled(width), scaled(height))
}

/// For each destination index, the source indices it covers and their
/// fractional overlap weights.
fn area_weights(src_len: u32, dst_len: u32) -> Vec<Vec<(usize, f32)>> {
    let ratio = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * ratio;
            let end = start + ratio;
            let mut taps = Vec::new();
            let mut s = start.floor() as u32;
            while (s as f64) < end && s < src_len {
                let overlap = (end.min(s as f64 + 1.0) - start.max(s as f64)) as f32;
                if overlap > 0.0 {
                    taps.push((s as usize, overlap / ratio as f32));
                }
                s += 1;
            }
            taps
        })
        .collect()
}

/// Box-integrating resample: every destination pixel is the area-weighted
/// mean of the source pixels its footprint covers.
pub fn resize_area(image: &GrayImage, new_w: u32, new_h: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    let x_taps = area_weights(w, new_w);
    let y_taps = area_weights(h, new_h);

    // Horizontal pass into floats, then vertical.
    let mut horizontal = vec![0f32; (new_w * h) as usize];
    for y in 0..h {
        for (dx, taps) in x_taps.iter().enumerate() {
            horizontal[(y * new_w) as usize + dx] = taps
                .iter()
                .map(|&(sx, wt)| image.get_pixel(sx as u32, y)[0] as f32 * wt)
                .sum();
        }
    }

    GrayImage::from_fn(new_w, new_h, |x, y| {
        let v: f32 = y_taps[y as usize]
            .iter()
            .map(|&(sy, wt)| horizontal[sy * new_w as usize + x as usize] * wt)
            .sum();
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

/// Scale the crop so its longer side is `params.target_size`.
pub fn resize_digit(crop: &GrayImage, filter: ResampleFilter, params: &NormalizationParams) -> GrayImage {
    let (w, h) = crop.dimensions();
    let (new_w, new_h) = target_dimensions(w, h, params.target_size);
    let enlarging = new_w > w || new_h > h;
    debug!(from = ?(w, h), to = ?(new_w, new_h), ?filter, "Resizing digit");

    match filter {
        ResampleFilter::AreaShrinkLinearEnlarge if enlarging => {
            imageops::resize(crop, new_w, new_h, imageops::FilterType::Triangle)
        }
        _ => resize_area(crop, new_w, new_h),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]))
    }

    #[test]
    fn longer_side_becomes_target() {
        for (w, h) in [(100, 60), (60, 100), (13, 9), (7, 40), (20, 20), (300, 299)] {
            let (nw, nh) = target_dimensions(w, h, 20);
            assert_eq!(nw.max(nh), 20, "{}x{} -> {}x{}", w, h, nw, nh);
            let before = w as f64 / h as f64;
            let after = nw as f64 / nh as f64;
            // Flooring moves each side by under one pixel.
            assert!((after - before).abs() <= before * (2.0 / nw.min(nh) as f64));
        }
    }

    #[test]
    fn tiny_sides_stay_at_least_one_pixel() {
        assert_eq!(target_dimensions(200, 3, 20), (20, 1));
    }

    #[test]
    fn area_shrink_averages_blocks() {
        let img = GrayImage::from_fn(4, 4, |x, _| Luma([if x < 2 { 0 } else { 200 }]));
        let out = resize_area(&img, 2, 2);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(1, 1)[0], 200);

        let out = resize_area(&img, 1, 1);
        assert_eq!(out.get_pixel(0, 0)[0], 100);
    }

    #[test]
    fn area_preserves_mean_intensity() {
        let img = gradient(50, 35);
        let out = resize_area(&img, 20, 14);
        let mean = |i: &GrayImage| i.as_raw().iter().map(|&v| v as f64).sum::<f64>() / i.as_raw().len() as f64;
        assert!((mean(&img) - mean(&out)).abs() < 2.0);
    }

    #[test]
    fn area_enlarge_replicates_pixels() {
        let img = GrayImage::from_fn(2, 2, |x, y| Luma([(x * 100 + y * 10) as u8]));
        let out = resize_area(&img, 4, 4);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(1, 1)[0], 0);
        assert_eq!(out.get_pixel(3, 3)[0], 110);
    }

    #[test]
    fn both_filters_hit_target_when_enlarging() {
        let params = NormalizationParams::default();
        let crop = gradient(9, 6);
        let area = resize_digit(&crop, ResampleFilter::Area, &params);
        let linear = resize_digit(&crop, ResampleFilter::AreaShrinkLinearEnlarge, &params);
        assert_eq!(area.dimensions(), (20, 13));
        assert_eq!(linear.dimensions(), (20, 13));
    }

    #[test]
    fn both_filters_agree_when_shrinking() {
        let params = NormalizationParams::default();
        let crop = gradient(80, 40);
        let area = resize_digit(&crop, ResampleFilter::Area, &params);
        let linear = resize_digit(&crop, ResampleFilter::AreaShrinkLinearEnlarge, &params);
        assert_eq!(area.dimensions(), (20, 10));
        assert_eq!(area, linear);
    }
}
