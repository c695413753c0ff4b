use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::classification::domain::detection_result::DetectionResult;
use crate::classification::domain::image_classifier::ImageClassifier;
use crate::classification::infrastructure::tensor_preprocessor::TensorPreprocessor;
use crate::pipeline::pipeline_config::FrameErrorPolicy;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::result_reducer::reduce_by_label;
use crate::pipeline::scratch_dir::ScratchDir;
use crate::sampling::frame_sampler::FrameSampler;
use crate::sampling::video_frame::VideoFrame;
use crate::shared::error::PipelineError;
use crate::video::domain::frame_source::FrameSource;

/// Lifecycle of one run. `Failed` is reachable from every state before
/// `Done`; `Cleanup` is entered on every path once the scratch directory
/// exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Created,
    ScratchAllocated,
    Sampling,
    ClassifyingFrame,
    Reducing,
    Cleanup,
    Done,
    Failed,
}

pub type ProgressCallback = Box<dyn Fn(usize, usize) -> bool + Send>;

/// Video classification pipeline: sample → preprocess → classify → reduce.
///
/// Owns its decoder and classifier for its whole lifetime; runs are strictly
/// sequential. The scratch directory is removed before `execute` returns,
/// whatever the outcome.
pub struct ProcessVideoUseCase {
    source: Box<dyn FrameSource>,
    sampler: FrameSampler,
    preprocessor: TensorPreprocessor,
    classifier: ImageClassifier,
    policy: FrameErrorPolicy,
    scratch_root: PathBuf,
    logger: Box<dyn PipelineLogger>,
    on_progress: Option<ProgressCallback>,
    cancelled: Arc<AtomicBool>,
    state: RunState,
}

impl ProcessVideoUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Box<dyn FrameSource>,
        sampler: FrameSampler,
        preprocessor: TensorPreprocessor,
        classifier: ImageClassifier,
        policy: FrameErrorPolicy,
        scratch_root: PathBuf,
        logger: Box<dyn PipelineLogger>,
        on_progress: Option<ProgressCallback>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            source,
            sampler,
            preprocessor,
            classifier,
            policy,
            scratch_root,
            logger,
            on_progress,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
            state: RunState::Created,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Classifies `video_path` and returns at most one result per label.
    ///
    /// Cancellation (flag or `on_progress` returning `false`) is observed
    /// between frames and reported as `Cancelled` after cleanup.
    pub fn execute(&mut self, video_path: &Path) -> Result<Vec<DetectionResult>, PipelineError> {
        self.state = RunState::Created;

        let scratch = match ScratchDir::allocate(&self.scratch_root) {
            Ok(scratch) => scratch,
            Err(e) => {
                transition(&mut self.state, RunState::Failed);
                return Err(e);
            }
        };
        transition(&mut self.state, RunState::ScratchAllocated);

        let outcome = self.run_in(video_path, scratch.path());

        transition(&mut self.state, RunState::Cleanup);
        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.release() {
            log::warn!(
                "Could not remove scratch directory {}: {e}",
                scratch_path.display()
            );
        }

        match outcome {
            Ok(results) => {
                transition(&mut self.state, RunState::Done);
                Ok(results)
            }
            Err(e) => {
                transition(&mut self.state, RunState::Failed);
                Err(e)
            }
        }
    }

    fn run_in(
        &mut self,
        video_path: &Path,
        scratch_dir: &Path,
    ) -> Result<Vec<DetectionResult>, PipelineError> {
        let Self {
            source,
            sampler,
            preprocessor,
            classifier,
            policy,
            logger,
            on_progress,
            cancelled,
            state,
            ..
        } = self;

        transition(state, RunState::Sampling);
        let mut frames = sampler.sample(&mut **source, video_path, scratch_dir)?;
        let planned = frames.planned_attempts();
        logger.info(&format!(
            "Classifying {} ({} frames, stride {}, up to {planned} samples)",
            video_path.display(),
            frames.metadata().total_frames,
            sampler.stride()
        ));

        let mut observed: Vec<DetectionResult> = Vec::new();
        let mut failed_frames = 0usize;

        loop {
            if cancelled.load(Ordering::Relaxed) {
                return Err(PipelineError::Cancelled);
            }

            let t0 = Instant::now();
            let Some(sampled) = frames.next() else {
                break;
            };
            logger.timing("decode", elapsed_ms(t0));
            let frame = sampled?;

            transition(state, RunState::ClassifyingFrame);
            match classify(preprocessor, classifier, &mut **logger, &frame) {
                Ok(results) => {
                    logger.metric("results_per_frame", results.len() as f64);
                    observed.extend(results);
                }
                Err(e) => match policy {
                    FrameErrorPolicy::Abort => return Err(e),
                    FrameErrorPolicy::Skip => {
                        log::warn!(
                            "Skipping {} at {:.2}s: {e}",
                            frame.image_path().display(),
                            frame.timestamp_seconds()
                        );
                        failed_frames += 1;
                    }
                },
            }
            transition(state, RunState::Sampling);

            let attempts = frames.attempts();
            logger.progress(attempts, planned);
            if let Some(cb) = on_progress.as_ref() {
                if !cb(attempts, planned) {
                    cancelled.store(true, Ordering::Relaxed);
                    return Err(PipelineError::Cancelled);
                }
            }
        }

        let skipped = frames.skipped();
        drop(frames);

        transition(state, RunState::Reducing);
        let pre_reduction = observed.len();
        let reduced = reduce_by_label(observed);

        logger.info(&format!(
            "{pre_reduction} observations reduced to {} labels ({skipped} undecodable, {failed_frames} unclassified)",
            reduced.len()
        ));
        logger.summary();
        Ok(reduced)
    }
}

fn classify(
    preprocessor: &TensorPreprocessor,
    classifier: &mut ImageClassifier,
    logger: &mut dyn PipelineLogger,
    frame: &VideoFrame,
) -> Result<Vec<DetectionResult>, PipelineError> {
    let t0 = Instant::now();
    let tensor = preprocessor.preprocess(frame.image_path())?;
    logger.timing("preprocess", elapsed_ms(t0));

    let t1 = Instant::now();
    let results = classifier.classify_frame(&tensor, frame.image_path())?;
    logger.timing("classify", elapsed_ms(t1));
    Ok(results)
}

fn transition(state: &mut RunState, next: RunState) {
    log::debug!("Run state {state:?} -> {next:?}");
    *state = next;
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
