use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    algorithms::ResampleFilter,
    error::{DigitPrepError, Result},
    segmenter::SegmenterVariant,
};

/// What to do when no usable digit region is found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionPolicy {
    /// Still classify an all-zero canvas and attach the result as a fallback.
    #[default]
    ClassifyBlankCanvas,
    /// Skip the classifier and report the rejection only.
    Report,
}

/// Per-request recognition options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Background segmenter variant; each variant has its own cached session.
    pub segmentation_model: SegmenterVariant,
    /// Average the classifier over five slightly rotated views.
    pub enable_tta: bool,
    /// Keep the intermediate buffers of every stage.
    pub return_intermediate_steps: bool,
    /// Compute the preprocessing quality score.
    pub return_quality_score: bool,
    pub rejection_policy: RejectionPolicy,
    pub resample_filter: ResampleFilter,
}

impl RecognizerConfig {
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RecognizerConfig)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load from a `.toml` or `.json` file, picked by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path)?),
            Some("json") => Self::from_json(&fs::read_to_string(path)?),
            _ => Err(DigitPrepError::UnsupportedConfigFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = RecognizerConfig::default();
        assert_eq!(config.segmentation_model, SegmenterVariant::Lightweight);
        assert!(!config.enable_tta);
        assert!(!config.return_intermediate_steps);
        assert!(!config.return_quality_score);
        assert_eq!(config.rejection_policy, RejectionPolicy::ClassifyBlankCanvas);
        assert_eq!(config.resample_filter, ResampleFilter::Area);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = RecognizerConfig::from_toml(
            r#"
            segmentation_model = "high-quality"
            enable_tta = true
            rejection_policy = "report"
            "#,
        )
        .unwrap();
        assert_eq!(config.segmentation_model, SegmenterVariant::HighQuality);
        assert!(config.enable_tta);
        assert_eq!(config.rejection_policy, RejectionPolicy::Report);
        assert!(!config.return_quality_score);
    }

    #[test]
    fn json_and_toml_round_trip() {
        let config = RecognizerConfig {
            segmentation_model: SegmenterVariant::Balanced,
            return_quality_score: true,
            resample_filter: ResampleFilter::AreaShrinkLinearEnlarge,
            ..Default::default()
        };
        assert_eq!(RecognizerConfig::from_json(&config.to_json().unwrap()).unwrap(), config);
        assert_eq!(RecognizerConfig::from_toml(&config.to_toml().unwrap()).unwrap(), config);
    }

    #[test]
    fn unknown_variant_is_an_error() {
        assert!(RecognizerConfig::from_json(r#"{"segmentation_model": "huge"}"#).is_err());
    }

    #[test]
    fn file_format_is_picked_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"enable_tta": true}}"#).unwrap();
        assert!(RecognizerConfig::from_file(file.path()).unwrap().enable_tta);

        let other = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(matches!(
            RecognizerConfig::from_file(other.path()),
            Err(DigitPrepError::UnsupportedConfigFormat)
        ));
    }

    #[test]
    fn schema_lists_fields() {
        let schema = serde_json::to_value(RecognizerConfig::schema()).unwrap();
        let props = &schema["properties"];
        assert!(props.get("segmentation_model").is_some());
        assert!(props.get("enable_tta").is_some());
    }
}
