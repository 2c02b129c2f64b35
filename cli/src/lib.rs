use std::path::Path;

use digit_prep::{BoundingBox, Normalization, QualityScore, RecognizerConfig, Rejection, StageOutcome};
use serde::{Deserialize, Serialize};

/// Whether the input produced a canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportStatus {
    Normalized,
    Rejected { reason: Rejection },
}

/// Summary printed by `digit-prep prepare`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrepareReport {
    pub input: String,
    #[serde(flatten)]
    pub status: ReportStatus,
    pub bbox: Option<BoundingBox>,
    pub quality: Option<QualityScore>,
    /// Where the 28x28 canvas was written, if anywhere.
    pub canvas: Option<String>,
    pub steps_dir: Option<String>,
}

impl PrepareReport {
    pub fn from_normalization(input: &Path, normalization: &Normalization) -> Self {
        let status = match &normalization.outcome {
            StageOutcome::Continue(_) => ReportStatus::Normalized,
            StageOutcome::Reject(reason) => ReportStatus::Rejected { reason: *reason },
        };
        Self {
            input: input.display().to_string(),
            status,
            bbox: normalization.bbox,
            quality: normalization.quality,
            canvas: None,
            steps_dir: None,
        }
    }

    pub fn with_canvas(mut self, path: &Path) -> Self {
        self.canvas = Some(path.display().to_string());
        self
    }

    pub fn with_steps_dir(mut self, path: &Path) -> Self {
        self.steps_dir = Some(path.display().to_string());
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Config from file when given, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> digit_prep::Result<RecognizerConfig> {
    match path {
        Some(path) => RecognizerConfig::from_file(path),
        None => Ok(RecognizerConfig::default()),
    }
}
