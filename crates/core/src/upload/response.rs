use std::path::Path;

use serde::Serialize;

use crate::classification::domain::detection_result::DetectionResult;
use crate::pipeline::result_reducer::{select_best_frame, sort_results, ResultOrder};
use crate::shared::error::PipelineError;

pub const SUCCESS_MESSAGE: &str = "Video processed successfully.";
pub const FAILURE_MESSAGE: &str = "An error occurred while processing the video.";

/// Body returned for a processed upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessVideoResponse {
    pub message: String,
    /// Free text supplied with the upload, echoed back.
    pub description: Option<String>,
    pub results: Vec<DetectionResult>,
}

impl ProcessVideoResponse {
    pub fn success(
        description: Option<String>,
        mut results: Vec<DetectionResult>,
        order: ResultOrder,
    ) -> Self {
        sort_results(&mut results, order);
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            description,
            results,
        }
    }

    /// Frame behind the most confident result, if any.
    pub fn best_frame(&self) -> Option<&Path> {
        select_best_frame(&self.results)
    }
}

/// Body returned when a run fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub message: String,
    pub details: String,
}

impl From<&PipelineError> for ErrorResponse {
    fn from(error: &PipelineError) -> Self {
        Self {
            message: FAILURE_MESSAGE.to_string(),
            details: error.to_string(),
        }
    }
}
