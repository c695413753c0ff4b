use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by a video classification run.
///
/// Per-frame decode failures during sampling never reach this type; they are
/// logged and the frame is skipped.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing or inconsistent model/label assets, or an invalid pipeline
    /// configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The input video could not be opened at all.
    #[error("video source unavailable ({path}): {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    /// A sampled frame artifact could not be decoded for classification.
    #[error("failed to decode image {path}: {reason}")]
    ImageDecode { path: PathBuf, reason: String },

    /// The inference engine failed or returned malformed output.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The supplied file exceeds the accepted size ceiling.
    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    UploadTooLarge { size: u64, limit: u64 },

    #[error("run cancelled")]
    Cancelled,

    /// The thread running the pipeline panicked before reporting an outcome.
    #[error("pipeline worker panicked")]
    WorkerPanicked,

    /// The run's scratch directory could not be created.
    #[error("failed to allocate scratch directory under {root}: {source}")]
    Scratch {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A decoded frame could not be persisted into the scratch directory.
    #[error("failed to write frame {index} to {path}: {reason}")]
    FrameWrite {
        index: usize,
        path: PathBuf,
        reason: String,
    },
}

impl PipelineError {
    /// True when the failure was caused by the caller's input rather than by
    /// the deployment (bad or oversized video).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::SourceUnavailable { .. } | PipelineError::UploadTooLarge { .. }
        )
    }
}
