use std::sync::Arc;

use crate::{
    algorithms::{NormalizationParams, ResampleFilter},
    config::{RecognizerConfig, RejectionPolicy},
    pipeline::Pipeline,
    segmenter::{SegmenterRegistry, SegmenterVariant},
    traits::SegmenterFactory,
};

/// Builder for creating recognition pipelines with a fluent API
pub struct PipelineBuilder {
    registry: Option<Arc<SegmenterRegistry>>,
    config: RecognizerConfig,
    params: NormalizationParams,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            registry: None,
            config: RecognizerConfig::default(),
            params: NormalizationParams::default(),
        }
    }

    /// Share an existing segmenter registry (and its cached sessions)
    pub fn registry(mut self, registry: Arc<SegmenterRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a fresh registry backed by the given factory
    pub fn segmenter_factory<F>(self, factory: F) -> Self
    where
        F: SegmenterFactory + 'static,
    {
        self.registry(Arc::new(SegmenterRegistry::new(factory)))
    }

    /// Replace the whole recognizer config
    pub fn config(mut self, config: RecognizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the numeric stage parameters
    pub fn params(mut self, params: NormalizationParams) -> Self {
        self.params = params;
        self
    }

    pub fn segmentation_model(mut self, variant: SegmenterVariant) -> Self {
        self.config.segmentation_model = variant;
        self
    }

    /// Enable the rotation ensemble
    pub fn with_tta(mut self) -> Self {
        self.config.enable_tta = true;
        self
    }

    /// Keep intermediate buffers of every stage
    pub fn with_intermediate_steps(mut self) -> Self {
        self.config.return_intermediate_steps = true;
        self
    }

    /// Compute the preprocessing quality score
    pub fn with_quality_score(mut self) -> Self {
        self.config.return_quality_score = true;
        self
    }

    pub fn rejection_policy(mut self, policy: RejectionPolicy) -> Self {
        self.config.rejection_policy = policy;
        self
    }

    pub fn resample_filter(mut self, filter: ResampleFilter) -> Self {
        self.config.resample_filter = filter;
        self
    }

    /// Longest side of the digit inside the canvas
    pub fn target_size(mut self, target_size: u32) -> Self {
        self.params.target_size = target_size;
        self
    }

    pub fn max_aspect_ratio(mut self, max_aspect_ratio: f32) -> Self {
        self.params.max_aspect_ratio = max_aspect_ratio;
        self
    }

    pub fn clahe(mut self, clip_limit: f32, tiles: u32) -> Self {
        self.params.clahe_clip_limit = clip_limit;
        self.params.clahe_tiles = tiles;
        self
    }

    /// Build the pipeline, falling back to a passthrough segmenter registry
    pub fn build(self) -> Pipeline {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(SegmenterRegistry::passthrough()));
        Pipeline::new(registry, self.config, self.params)
    }

    /// Build a pipeline that returns every diagnostic: steps, quality and TTA
    pub fn build_diagnostic(registry: Arc<SegmenterRegistry>) -> Pipeline {
        Self::new()
            .registry(registry)
            .with_tta()
            .with_intermediate_steps()
            .with_quality_score()
            .build()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_land_in_config_and_params() {
        let pipeline = PipelineBuilder::new()
            .segmentation_model(SegmenterVariant::Balanced)
            .with_tta()
            .with_quality_score()
            .rejection_policy(RejectionPolicy::Report)
            .target_size(18)
            .clahe(3.0, 8)
            .build();

        let config = pipeline.config();
        assert_eq!(config.segmentation_model, SegmenterVariant::Balanced);
        assert!(config.enable_tta);
        assert!(config.return_quality_score);
        assert!(!config.return_intermediate_steps);
        assert_eq!(config.rejection_policy, RejectionPolicy::Report);

        let params = pipeline.params();
        assert_eq!(params.target_size, 18);
        assert_eq!(params.clahe_clip_limit, 3.0);
        assert_eq!(params.clahe_tiles, 8);
    }

    #[test]
    fn shared_registry_is_reused() {
        let registry = Arc::new(SegmenterRegistry::passthrough());
        let a = PipelineBuilder::new().registry(Arc::clone(&registry)).build();
        let b = PipelineBuilder::build_diagnostic(Arc::clone(&registry));
        assert!(Arc::ptr_eq(a.registry(), b.registry()));
        assert!(b.config().enable_tta && b.config().return_intermediate_steps);
    }
}
