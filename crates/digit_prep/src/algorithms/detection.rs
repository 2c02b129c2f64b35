use image::{imageops, GrayImage};
use tracing::{debug, warn};

use crate::{
    algorithms::NormalizationParams,
    types::{BoundingBox, Rejection, StageOutcome, CANVAS_SIZE},
};

/// The located digit, cropped from the denoised buffer.
#[derive(Debug, Clone)]
pub struct DetectedRegion {
    /// Tight box around the thresholded foreground.
    pub bbox: BoundingBox,
    /// `bbox` after padding and clamping; the crop covers this box.
    pub crop_box: BoundingBox,
    /// Crop of the denoised buffer, always bright digit on dark background.
    pub crop: GrayImage,
    pub aspect_ratio: f32,
    /// `max(h, w)` of the tight box.
    pub max_dim: u32,
}

/// Otsu binarization of the blurred buffer, inverted for light backgrounds so
/// the digit is always the nonzero class. Only used to locate the digit.
///
/// A uniform buffer has no foreground and yields an all-zero mask.
pub fn binarize(blurred: &GrayImage, light_background: bool) -> GrayImage {
    let raw = blurred.as_raw();
    let (min, max) = raw
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if raw.is_empty() || min == max {
        return GrayImage::new(blurred.width(), blurred.height());
    }

    let level = imageproc::contrast::otsu_level(blurred);
    debug!(level, light_background, "Otsu threshold");

    let mut binary = imageproc::contrast::threshold(blurred, level);
    if light_background {
        imageops::invert(&mut binary);
    }
    binary
}

/// Min/max coordinates of the nonzero pixels.
pub fn foreground_bounds(binary: &GrayImage) -> Option<BoundingBox> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, px) in binary.enumerate_pixels() {
        if px[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (y, x, y, x),
            Some((y0, x0, y1, x1)) => (y0.min(y), x0.min(x), y1.max(y), x1.max(x)),
        });
    }
    bounds.map(|(y0, x0, y1, x1)| BoundingBox::new(y0, x0, y1, x1))
}

/// Padding around the tight box: the canvas margin plus 10% of the digit.
pub fn region_padding(max_dim: u32, params: &NormalizationParams) -> u32 {
    let optimal_pad = (CANVAS_SIZE.saturating_sub(params.target_size) / 2).max(2);
    optimal_pad + (max_dim as f32 * 0.1).floor() as u32
}

/// Locate, validate and crop the digit.
pub fn extract_region(
    blurred: &GrayImage,
    binary: &GrayImage,
    light_background: bool,
    params: &NormalizationParams,
) -> StageOutcome<DetectedRegion> {
    let Some(bbox) = foreground_bounds(binary) else {
        warn!("No foreground after thresholding");
        return StageOutcome::Reject(Rejection::DetectionFailure);
    };

    let aspect_ratio = bbox.aspect_ratio();
    if aspect_ratio > params.max_aspect_ratio {
        warn!(aspect_ratio, ?bbox, "Rejecting elongated detection");
        return StageOutcome::Reject(Rejection::MalformedDetection { aspect_ratio });
    }

    let max_dim = bbox.max_dim();
    let pad = region_padding(max_dim, params);
    let crop_box = bbox.expand(pad, blurred.width(), blurred.height());
    debug!(?bbox, ?crop_box, pad, "Digit region");

    let mut crop = imageops::crop_imm(
        blurred,
        crop_box.x0,
        crop_box.y0,
        crop_box.width() + 1,
        crop_box.height() + 1,
    )
    .to_image();
    if light_background {
        imageops::invert(&mut crop);
    }

    StageOutcome::Continue(DetectedRegion {
        bbox,
        crop_box,
        crop,
        aspect_ratio,
        max_dim,
    })
}
