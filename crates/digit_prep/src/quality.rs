//! Heuristic confidence score for how well the preprocessing went.
//!
//! The score is diagnostic only and never changes the classification.

use std::fmt;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum QualityLevel {
    Excellent,
    Good,
    Medium,
    Low,
}

impl QualityLevel {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.75 {
            Self::Excellent
        } else if score >= 0.5 {
            Self::Good
        } else if score >= 0.3 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub global_score: f32,
    pub quality_level: QualityLevel,
    /// Standard deviation of the crop's pixel values.
    pub contrast: f32,
    pub contrast_score: f32,
    /// Longest side of the tight bounding box, in source pixels.
    pub size_px: u32,
    pub size_score: f32,
    pub aspect_ratio: f32,
    pub aspect_score: f32,
}

impl fmt::Display for QualityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.2}): contrast {:.2} [{:.2}], size {}px [{:.2}], aspect {:.2} [{:.2}]",
            self.quality_level,
            self.global_score,
            self.contrast,
            self.contrast_score,
            self.size_px,
            self.size_score,
            self.aspect_ratio,
            self.aspect_score,
        )
    }
}

/// Population standard deviation of the pixel values.
pub fn pixel_stddev(image: &GrayImage) -> f32 {
    let raw = image.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    let n = raw.len() as f64;
    let mean = raw.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = raw.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    var.sqrt() as f32
}

/// Saturates at 1.0 once contrast reaches 50.
pub fn contrast_score(contrast: f32) -> f32 {
    (contrast / 50.0).min(1.0)
}

pub fn size_score(size_px: u32) -> f32 {
    let size = size_px as f32;
    if (50.0..=500.0).contains(&size) {
        1.0
    } else if size < 50.0 {
        size / 50.0
    } else {
        (1.0 - (size - 500.0) / 500.0).max(0.0)
    }
}

pub fn aspect_score(aspect_ratio: f32) -> f32 {
    if (0.5..=2.0).contains(&aspect_ratio) {
        1.0
    } else {
        (1.0 - (aspect_ratio - 1.0).abs() / 2.0).max(0.0)
    }
}

/// Score a contrast-normalized crop together with its detection geometry.
pub fn score(crop: &GrayImage, aspect_ratio: f32, size_px: u32) -> QualityScore {
    let contrast = pixel_stddev(crop);
    let contrast_score = contrast_score(contrast);
    let size_score = size_score(size_px);
    let aspect_score = aspect_score(aspect_ratio);
    let weighted = 0.5 * contrast_score as f64 + 0.3 * size_score as f64 + 0.2 * aspect_score as f64;
    let global_score = weighted.clamp(0.0, 1.0) as f32;

    QualityScore {
        global_score,
        quality_level: QualityLevel::from_score(global_score),
        contrast,
        contrast_score,
        size_px,
        size_score,
        aspect_ratio,
        aspect_score,
    }
}
