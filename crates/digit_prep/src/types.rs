use std::fmt;
use std::path::Path;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::{DigitPrepError, Result};
use crate::quality::QualityScore;

/// Side length of the canonical classifier input.
pub const CANVAS_SIZE: u32 = 28;
/// Number of digit classes.
pub const NUM_CLASSES: usize = 10;
/// Mean the classifier subtracts from raw [0, 255] input.
pub const MNIST_MEAN: f32 = 33.3184;
/// Standard deviation the classifier divides by.
pub const MNIST_STD: f32 = 78.5675;

/// Probability vector over the ten digit classes.
pub type ClassProbabilities = [f32; NUM_CLASSES];

/// Outcome of a single pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Continue(T),
    Reject(Rejection),
}

/// Why a detection was refused before normalization could finish.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// Nothing survived thresholding (blank or uniform input).
    DetectionFailure,
    /// The bounding box is too elongated to be a digit.
    MalformedDetection { aspect_ratio: f32 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DetectionFailure => write!(f, "no foreground pixels survived thresholding"),
            Self::MalformedDetection { aspect_ratio } => {
                write!(f, "bounding box aspect ratio {:.2} exceeds limit", aspect_ratio)
            }
        }
    }
}

/// Inclusive integer rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub y0: u32,
    pub x0: u32,
    pub y1: u32,
    pub x1: u32,
}

impl BoundingBox {
    pub fn new(y0: u32, x0: u32, y1: u32, x1: u32) -> Self {
        debug_assert!(y1 >= y0 && x1 >= x0);
        Self { y0, x0, y1, x1 }
    }

    /// Coordinate extent `y1 - y0`.
    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    /// Coordinate extent `x1 - x0`.
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn max_dim(&self) -> u32 {
        self.height().max(self.width())
    }

    pub fn aspect_ratio(&self) -> f32 {
        let (h, w) = (self.height(), self.width());
        h.max(w) as f32 / h.min(w).max(1) as f32
    }

    /// Grow by `pad` on every side, clamped to a `width`x`height` image.
    pub fn expand(&self, pad: u32, width: u32, height: u32) -> Self {
        Self {
            y0: self.y0.saturating_sub(pad),
            x0: self.x0.saturating_sub(pad),
            y1: (self.y1 + pad).min(height.saturating_sub(1)),
            x1: (self.x1 + pad).min(width.saturating_sub(1)),
        }
    }
}

/// The (1, 28, 28, 1) float tensor handed to the classifier, values in [0, 255].
#[derive(Debug, Clone, PartialEq)]
pub struct DigitTensor {
    data: Vec<f32>,
}

impl DigitTensor {
    pub const SHAPE: [usize; 4] = [1, CANVAS_SIZE as usize, CANVAS_SIZE as usize, 1];

    pub fn from_canvas(canvas: &GrayImage) -> Result<Self> {
        if canvas.dimensions() != (CANVAS_SIZE, CANVAS_SIZE) {
            return Err(DigitPrepError::InvalidCanonicalShape {
                expected: CANVAS_SIZE,
                width: canvas.width(),
                height: canvas.height(),
            });
        }
        Ok(Self {
            data: canvas.as_raw().iter().map(|&v| v as f32).collect(),
        })
    }

    pub fn zeros() -> Self {
        Self {
            data: vec![0.0; (CANVAS_SIZE * CANVAS_SIZE) as usize],
        }
    }

    /// Row-major values in [0, 255].
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Values standardized with the training mean and std, for classifiers
    /// that do not normalize internally.
    pub fn standardized(&self) -> Vec<f32> {
        self.data.iter().map(|v| (v - MNIST_MEAN) / MNIST_STD).collect()
    }
}

/// One ranked class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedDigit {
    pub digit: u8,
    pub confidence: f32,
}

/// Top-3 classes by descending confidence, ties broken by ascending digit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub top: [RankedDigit; 3],
}

impl Prediction {
    pub fn best(&self) -> RankedDigit {
        self.top[0]
    }
}

/// What the pipeline concluded for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Recognized { prediction: Prediction },
    Rejected {
        reason: Rejection,
        /// Classification of the blank canvas, when the rejection policy asks for it.
        fallback: Option<Prediction>,
    },
}

/// Full answer for one request. Steps and quality are present only when requested.
#[derive(Debug, Clone)]
pub struct Recognition {
    pub outcome: Outcome,
    pub steps: Option<PipelineSteps>,
    pub quality: Option<QualityScore>,
}

impl Recognition {
    /// The ranked classes, including the blank-canvas fallback of a rejected
    /// detection. `None` only when the rejection policy skipped the classifier.
    pub fn top3(&self) -> Option<&Prediction> {
        match &self.outcome {
            Outcome::Recognized { prediction } => Some(prediction),
            Outcome::Rejected { fallback, .. } => fallback.as_ref(),
        }
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self.outcome {
            Outcome::Rejected { reason, .. } => Some(reason),
            Outcome::Recognized { .. } => None,
        }
    }
}

/// Intermediate 8-bit buffers, in pipeline order.
#[derive(Debug, Clone)]
pub struct PipelineSteps {
    pub background_removed: GrayImage,
    pub grayscale: GrayImage,
    pub blurred: GrayImage,
    pub binary_detection: GrayImage,
    pub cropped_grayscale: GrayImage,
    pub resized: GrayImage,
    pub final_28x28: GrayImage,
}

impl PipelineSteps {
    pub const NAMES: [&'static str; 7] = [
        "background_removed",
        "grayscale",
        "blurred",
        "binary_detection",
        "cropped_grayscale",
        "resized",
        "final_28x28",
    ];

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &GrayImage)> {
        let buffers = [
            &self.background_removed,
            &self.grayscale,
            &self.blurred,
            &self.binary_detection,
            &self.cropped_grayscale,
            &self.resized,
            &self.final_28x28,
        ];
        Self::NAMES.into_iter().zip(buffers)
    }

    pub fn get(&self, name: &str) -> Option<&GrayImage> {
        self.iter().find(|(n, _)| *n == name).map(|(_, img)| img)
    }

    /// Write every step as `{index}_{name}.png` into `dir`.
    pub fn save_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        for (i, (name, img)) in self.iter().enumerate() {
            img.save(dir.join(format!("{}_{}.png", i, name)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_uses_coordinate_extents() {
        let bbox = BoundingBox::new(10, 10, 30, 130);
        assert_eq!(bbox.height(), 20);
        assert_eq!(bbox.width(), 120);
        assert!((bbox.aspect_ratio() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_box_has_unit_denominator() {
        let line = BoundingBox::new(5, 5, 5, 9);
        assert!((line.aspect_ratio() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn expand_clamps_to_image() {
        let bbox = BoundingBox::new(2, 3, 40, 50).expand(5, 52, 42);
        assert_eq!(bbox, BoundingBox::new(0, 0, 41, 51));
    }

    #[test]
    fn steps_iterate_in_pipeline_order() {
        let blank = GrayImage::new(1, 1);
        let steps = PipelineSteps {
            background_removed: blank.clone(),
            grayscale: blank.clone(),
            blurred: blank.clone(),
            binary_detection: blank.clone(),
            cropped_grayscale: blank.clone(),
            resized: blank.clone(),
            final_28x28: GrayImage::new(28, 28),
        };
        let names: Vec<_> = steps.iter().map(|(n, _)| n).collect();
        assert_eq!(names, PipelineSteps::NAMES);
        assert_eq!(steps.get("final_28x28").map(|i| i.width()), Some(28));
    }

    #[test]
    fn standardized_tensor_uses_training_stats() {
        let t = DigitTensor::zeros();
        let s = t.standardized();
        assert_eq!(s.len(), 784);
        assert!((s[0] + MNIST_MEAN / MNIST_STD).abs() < 1e-6);
    }

    #[test]
    fn tensor_requires_canonical_canvas() {
        let tensor = DigitTensor::from_canvas(&GrayImage::from_pixel(28, 28, image::Luma([200]))).unwrap();
        assert_eq!(tensor.as_slice().len(), 784);
        assert!(tensor.as_slice().iter().all(|&v| v == 200.0));

        let err = DigitTensor::from_canvas(&GrayImage::new(32, 32)).unwrap_err();
        assert!(matches!(err, DigitPrepError::InvalidCanonicalShape { width: 32, height: 32, .. }));
    }
}
