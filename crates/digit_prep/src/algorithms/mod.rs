pub mod compositing;
pub mod denoise;
pub mod detection;
pub mod contrast;
pub mod resize;
pub mod centering;
pub mod morphology;

pub use compositing::{composite, BackgroundColor};
pub use denoise::{denoise, is_light_background, to_grayscale};
pub use detection::{binarize, extract_region, DetectedRegion};
pub use contrast::{clahe, normalize_contrast, stretch_histogram};
pub use resize::{resize_digit, ResampleFilter};
pub use centering::{center_of_mass, place_on_canvas};
pub use morphology::close;

use serde::{Deserialize, Serialize};

/// Numeric knobs of the normalization stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    /// Longest side of the digit after resizing, at most the 28px canvas.
    pub target_size: u32,
    /// Detections more elongated than this are rejected.
    pub max_aspect_ratio: f32,
    pub min_blur_kernel: u32,
    pub max_blur_kernel: u32,
    /// Image width per unit of blur kernel size.
    pub blur_resolution_divisor: u32,
    /// Mean intensity above which the background counts as light.
    pub polarity_threshold: f64,
    pub clahe_clip_limit: f32,
    /// CLAHE grid is `clahe_tiles`x`clahe_tiles`.
    pub clahe_tiles: u32,
    /// Side of the square closing element.
    pub closing_size: u32,
}

impl Default for NormalizationParams {
    fn default() -> Self {
        Self {
            target_size: 20,
            max_aspect_ratio: 5.0,
            min_blur_kernel: 3,
            max_blur_kernel: 7,
            blur_resolution_divisor: 100,
            polarity_threshold: 127.0,
            clahe_clip_limit: 2.0,
            clahe_tiles: 4,
            closing_size: 2,
        }
    }
}
