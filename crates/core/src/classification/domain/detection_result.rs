use std::path::PathBuf;

use serde::Serialize;

/// One label observed in one sampled frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub label: String,
    /// Softmax probability in `[0, 1]`.
    pub confidence: f32,
    pub source_frame_path: PathBuf,
}

impl DetectionResult {
    pub fn new(label: impl Into<String>, confidence: f32, source_frame_path: PathBuf) -> Self {
        Self {
            label: label.into(),
            confidence,
            source_frame_path,
        }
    }
}
