use std::sync::Arc;

use image::{DynamicImage, RgbaImage};

use crate::{
    error::Result,
    segmenter::SegmenterVariant,
    types::{ClassProbabilities, DigitTensor},
};

/// Isolates digit pixels from an arbitrary background.
pub trait BackgroundSegmenter: Send + Sync {
    /// Return an RGBA image of the same size whose alpha channel marks foreground.
    fn segment(&self, image: &DynamicImage) -> Result<RgbaImage>;
}

/// Builds segmenter sessions for the registry.
pub trait SegmenterFactory: Send + Sync {
    fn create(&self, variant: SegmenterVariant) -> Result<Arc<dyn BackgroundSegmenter>>;
}

/// The fixed digit classifier.
pub trait DigitClassifier: Send + Sync {
    /// Class probabilities for a (1, 28, 28, 1) tensor with values in [0, 255].
    fn predict(&self, input: &DigitTensor) -> Result<ClassProbabilities>;
}
