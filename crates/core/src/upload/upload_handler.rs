use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::pipeline::infrastructure::background_run::BackgroundRun;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::result_reducer::ResultOrder;
use crate::pipeline::video_classification_service::VideoClassificationService;
use crate::shared::constants::MAX_UPLOAD_BYTES;
use crate::shared::error::PipelineError;
use crate::upload::response::ProcessVideoResponse;
use crate::upload::staged_upload::StagedUpload;

/// Boundary rules applied to every upload.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    /// Whole-run limit; the run is cancelled when it elapses.
    pub timeout: Option<Duration>,
    pub staging_dir: PathBuf,
    pub order: ResultOrder,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            timeout: None,
            staging_dir: std::env::temp_dir(),
            order: ResultOrder::default(),
        }
    }
}

/// Transport-agnostic request handling: stage the upload, run the pipeline
/// off the calling thread, build the response, drop the staged copy.
pub struct UploadHandler {
    service: Arc<VideoClassificationService>,
    policy: UploadPolicy,
}

impl UploadHandler {
    pub fn new(service: Arc<VideoClassificationService>, policy: UploadPolicy) -> Self {
        Self { service, policy }
    }

    pub fn handle(
        &self,
        upload: &Path,
        description: Option<String>,
        logger: Box<dyn PipelineLogger>,
    ) -> Result<ProcessVideoResponse, PipelineError> {
        let staged = StagedUpload::stage(upload, self.policy.max_bytes, &self.policy.staging_dir)?;

        let run = BackgroundRun::spawn_with_logger(
            self.service.clone(),
            staged.path().to_path_buf(),
            logger,
        );
        let outcome = run.wait(self.policy.timeout);

        // Outcome first; a failed delete is only logged.
        let _ = staged.discard();

        let results = outcome?;
        Ok(ProcessVideoResponse::success(
            description,
            results,
            self.policy.order,
        ))
    }
}
