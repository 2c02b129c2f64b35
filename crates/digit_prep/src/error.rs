use thiserror::Error;

#[derive(Error, Debug)]
pub enum DigitPrepError {
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Background segmenter failed: {0}")]
    Segmenter(String),

    #[error("Segmenter returned a {actual_width}x{actual_height} image for a {expected_width}x{expected_height} input")]
    SegmenterShapeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Digit classifier failed: {0}")]
    Classifier(String),

    #[error("Classifier returned a non-finite probability for class {class}")]
    InvalidProbabilities { class: usize },

    #[error("Expected a {expected}x{expected} canonical image, got {width}x{height}")]
    InvalidCanonicalShape { expected: u32, width: u32, height: u32 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported config format. Please use .toml or .json files")]
    UnsupportedConfigFormat,
}

impl DigitPrepError {
    /// Failures of the external segmenter or classifier. These are fatal for
    /// the request and never retried.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::Segmenter(_)
                | Self::SegmenterShapeMismatch { .. }
                | Self::Classifier(_)
                | Self::InvalidProbabilities { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DigitPrepError>;
