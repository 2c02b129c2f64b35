pub mod builder;

use std::sync::Arc;

use image::{DynamicImage, GrayImage};
use tracing::{debug, info, warn};

use crate::{
    algorithms::{
        binarize, close, composite, denoise, extract_region, is_light_background,
        normalize_contrast, place_on_canvas, resize_digit, to_grayscale, NormalizationParams,
    },
    config::{RecognizerConfig, RejectionPolicy},
    error::{DigitPrepError, Result},
    quality::{self, QualityScore},
    ranking,
    segmenter::{segment_checked, SegmenterRegistry},
    traits::DigitClassifier,
    tta,
    types::{BoundingBox, Outcome, PipelineSteps, Prediction, Recognition, StageOutcome, CANVAS_SIZE},
};

/// Result of running the normalization stages without classification.
#[derive(Debug, Clone)]
pub struct Normalization {
    /// The repaired canvas, or why the detection was refused.
    pub outcome: StageOutcome<GrayImage>,
    /// Tight box around the detected digit, when one was accepted.
    pub bbox: Option<BoundingBox>,
    pub steps: Option<PipelineSteps>,
    pub quality: Option<QualityScore>,
}

/// The digit normalization pipeline.
///
/// Stages run strictly in order: segment, composite, grayscale, denoise,
/// polarity, region extraction, contrast normalization, resize, centering,
/// morphological repair. Classification and ranking follow in
/// [`Pipeline::recognize`].
pub struct Pipeline {
    registry: Arc<SegmenterRegistry>,
    config: RecognizerConfig,
    params: NormalizationParams,
}

impl Pipeline {
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(registry: Arc<SegmenterRegistry>, config: RecognizerConfig, params: NormalizationParams) -> Self {
        Self {
            registry,
            config,
            params,
        }
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn params(&self) -> &NormalizationParams {
        &self.params
    }

    pub fn registry(&self) -> &Arc<SegmenterRegistry> {
        &self.registry
    }

    /// Normalize with the pipeline's own config.
    pub fn normalize(&self, image: &DynamicImage) -> Result<Normalization> {
        self.normalize_with(image, &self.config)
    }

    pub fn normalize_with(&self, image: &DynamicImage, config: &RecognizerConfig) -> Result<Normalization> {
        let params = &self.params;
        let keep_steps = config.return_intermediate_steps;

        let segmenter = self.registry.get_or_create(config.segmentation_model)?;
        let segmented = segment_checked(segmenter.as_ref(), image)?;

        let composited = composite(&segmented);
        let gray = to_grayscale(&composited);
        let blurred = denoise(&gray, params);
        let light_background = is_light_background(&blurred, params);
        let binary = binarize(&blurred, light_background);

        let region = match extract_region(&blurred, &binary, light_background, params) {
            StageOutcome::Continue(region) => region,
            StageOutcome::Reject(reason) => {
                let blank = || GrayImage::new(CANVAS_SIZE, CANVAS_SIZE);
                let steps = keep_steps.then(|| PipelineSteps {
                    background_removed: gray.clone(),
                    grayscale: gray,
                    blurred,
                    binary_detection: binary,
                    cropped_grayscale: blank(),
                    resized: blank(),
                    final_28x28: blank(),
                });
                return Ok(Normalization {
                    outcome: StageOutcome::Reject(reason),
                    bbox: None,
                    steps,
                    quality: None,
                });
            }
        };

        let digit = normalize_contrast(&region.crop, params);
        let quality = config
            .return_quality_score
            .then(|| quality::score(&digit, region.aspect_ratio, region.max_dim));
        if let Some(q) = &quality {
            debug!(score = q.global_score, level = %q.quality_level, "Preprocessing quality");
        }

        let resized = resize_digit(&digit, config.resample_filter, params);
        let centered = place_on_canvas(&resized, CANVAS_SIZE);
        let repaired = close(&centered, params.closing_size);

        let steps = keep_steps.then(|| PipelineSteps {
            background_removed: gray.clone(),
            grayscale: gray,
            blurred,
            binary_detection: binary,
            cropped_grayscale: digit,
            resized,
            final_28x28: repaired.clone(),
        });

        Ok(Normalization {
            outcome: StageOutcome::Continue(repaired),
            bbox: Some(region.bbox),
            steps,
            quality,
        })
    }

    /// Recognize with the pipeline's own config.
    pub fn recognize(&self, image: &DynamicImage, classifier: &dyn DigitClassifier) -> Result<Recognition> {
        self.recognize_with(image, classifier, &self.config)
    }

    /// Normalize, classify (with TTA if enabled) and rank.
    pub fn recognize_with(
        &self,
        image: &DynamicImage,
        classifier: &dyn DigitClassifier,
        config: &RecognizerConfig,
    ) -> Result<Recognition> {
        let normalization = self.normalize_with(image, config)?;

        let outcome = match &normalization.outcome {
            StageOutcome::Continue(canvas) => {
                let probabilities = tta::classify(canvas, classifier, config.enable_tta)?;
                let prediction = ranking::top3(&probabilities);
                info!(digit = prediction.best().digit, confidence = prediction.best().confidence, "Digit recognized");
                Outcome::Recognized { prediction }
            }
            StageOutcome::Reject(reason) => {
                let fallback = match config.rejection_policy {
                    // The blank canvas is classified once, without TTA.
                    RejectionPolicy::ClassifyBlankCanvas => {
                        let blank = GrayImage::new(CANVAS_SIZE, CANVAS_SIZE);
                        let probabilities = tta::classify_once(classifier, &blank)?;
                        Some(ranking::top3(&probabilities))
                    }
                    RejectionPolicy::Report => None,
                };
                warn!(%reason, classified_blank = fallback.is_some(), "Detection rejected");
                Outcome::Rejected {
                    reason: *reason,
                    fallback,
                }
            }
        };

        Ok(Recognition {
            outcome,
            steps: normalization.steps,
            quality: normalization.quality,
        })
    }

    /// Classify an image that is already in canonical 28x28 form, skipping
    /// every normalization stage.
    pub fn classify_canonical(&self, image: &GrayImage, classifier: &dyn DigitClassifier) -> Result<Prediction> {
        if image.dimensions() != (CANVAS_SIZE, CANVAS_SIZE) {
            return Err(DigitPrepError::InvalidCanonicalShape {
                expected: CANVAS_SIZE,
                width: image.width(),
                height: image.height(),
            });
        }
        let probabilities = tta::classify(image, classifier, self.config.enable_tta)?;
        Ok(ranking::top3(&probabilities))
    }

    pub fn info(&self) -> String {
        format!(
            "Pipeline: segmenter {} ({}), tta {}, target {}px in {}x{} canvas",
            self.config.segmentation_model,
            self.config.segmentation_model.model_name(),
            if self.config.enable_tta { "on" } else { "off" },
            self.params.target_size,
            CANVAS_SIZE,
            CANVAS_SIZE,
        )
    }
}
