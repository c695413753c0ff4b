use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::classification::domain::detection_result::DetectionResult;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pipeline::video_classification_service::VideoClassificationService;
use crate::shared::error::PipelineError;

type Outcome = Result<Vec<DetectionResult>, PipelineError>;

/// A `process_video` call running on its own worker thread.
///
/// The caller stays free to time out or cancel. Cancellation is cooperative:
/// the worker stops between frames and removes its scratch directory before
/// reporting back. Dropping an unfinished run cancels it and joins the worker.
pub struct BackgroundRun {
    cancelled: Arc<AtomicBool>,
    outcome: Receiver<Outcome>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundRun {
    pub fn spawn(service: Arc<VideoClassificationService>, path: PathBuf) -> Self {
        Self::spawn_with_logger(service, path, Box::new(NullPipelineLogger))
    }

    pub fn spawn_with_logger(
        service: Arc<VideoClassificationService>,
        path: PathBuf,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = crossbeam_channel::bounded::<Outcome>(1);

        let flag = cancelled.clone();
        let handle = std::thread::spawn(move || {
            let outcome = service.process_video_with(&path, logger, Some(flag));
            // The receiver may already be gone if the caller dropped the run.
            let _ = tx.send(outcome);
        });

        Self {
            cancelled,
            outcome: rx,
            handle: Some(handle),
        }
    }

    /// Asks the worker to stop at the next frame boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Blocks until the run finishes, or until `timeout` elapses, in which
    /// case the run is cancelled and this still waits for the worker's
    /// cleanup before returning `Cancelled`.
    pub fn wait(mut self, timeout: Option<Duration>) -> Outcome {
        let received = match timeout {
            None => self.outcome.recv().ok(),
            Some(limit) => match self.outcome.recv_timeout(limit) {
                Ok(outcome) => Some(outcome),
                Err(RecvTimeoutError::Disconnected) => None,
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("Run exceeded {:.1}s, cancelling", limit.as_secs_f64());
                    self.cancel();
                    // Drain so the worker's cleanup has finished before we report.
                    let _ = self.outcome.recv();
                    self.join();
                    return Err(PipelineError::Cancelled);
                }
            },
        };

        self.join();
        received.unwrap_or(Err(PipelineError::WorkerPanicked))
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Pipeline worker panicked");
            }
        }
    }
}

impl Drop for BackgroundRun {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel();
            self.join();
        }
    }
}
