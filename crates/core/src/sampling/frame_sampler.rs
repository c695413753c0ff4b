use std::path::{Path, PathBuf};

use crate::sampling::video_frame::VideoFrame;
use crate::shared::error::PipelineError;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::FrameSource;
use crate::video::domain::image_writer::ImageWriter;

/// Picks every `stride`-th frame of a video, resizes it to the classifier
/// input size and persists it into a scratch directory.
pub struct FrameSampler {
    image_writer: Box<dyn ImageWriter>,
    stride: usize,
    size: (u32, u32),
    frame_format: String,
}

impl FrameSampler {
    pub fn new(
        image_writer: Box<dyn ImageWriter>,
        stride: usize,
        size: (u32, u32),
        frame_format: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        if stride == 0 {
            return Err(PipelineError::Configuration(
                "sampling stride must be >= 1".into(),
            ));
        }
        Ok(Self {
            image_writer,
            stride,
            size,
            frame_format: frame_format.into(),
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Opens `video_path` and returns a lazy, single-pass sequence of sampled
    /// frames written under `scratch_dir`.
    ///
    /// Fails with `SourceUnavailable` only if the video cannot be opened;
    /// frames that fail to decode are skipped by the returned iterator.
    pub fn sample<'a>(
        &'a self,
        source: &'a mut dyn FrameSource,
        video_path: &Path,
        scratch_dir: &'a Path,
    ) -> Result<SampledFrames<'a>, PipelineError> {
        let unavailable = |reason: String| PipelineError::SourceUnavailable {
            path: video_path.to_path_buf(),
            reason,
        };

        let metadata = source.open(video_path).map_err(|e| unavailable(e.to_string()))?;
        if !(metadata.fps.is_finite() && metadata.fps > 0.0) {
            source.close();
            return Err(unavailable(format!("invalid frame rate {}", metadata.fps)));
        }

        log::debug!(
            "Sampling {} ({} frames @ {:.2} fps, stride {})",
            video_path.display(),
            metadata.total_frames,
            metadata.fps,
            self.stride
        );

        Ok(SampledFrames {
            sampler: self,
            source,
            metadata,
            scratch_dir,
            next_index: 0,
            attempts: 0,
            skipped: 0,
        })
    }
}

/// Number of indices visited for `total_frames` at `stride`: `ceil(N / s)`.
pub fn planned_attempts(total_frames: usize, stride: usize) -> usize {
    total_frames.div_ceil(stride)
}

/// Iterator over the sampled frames of one opened video.
///
/// Yields `Err` only when a decoded frame cannot be written to the scratch
/// directory. The frame source is closed when the iterator is dropped.
pub struct SampledFrames<'a> {
    sampler: &'a FrameSampler,
    source: &'a mut dyn FrameSource,
    metadata: VideoMetadata,
    scratch_dir: &'a Path,
    next_index: usize,
    attempts: usize,
    skipped: usize,
}

impl SampledFrames<'_> {
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Seek-and-decode attempts made so far.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Attempts that produced no usable frame.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn planned_attempts(&self) -> usize {
        planned_attempts(self.metadata.total_frames, self.sampler.stride)
    }

    fn frame_path(&self, index: usize) -> PathBuf {
        self.scratch_dir
            .join(format!("frame_{index}.{}", self.sampler.frame_format))
    }
}

impl Iterator for SampledFrames<'_> {
    type Item = Result<VideoFrame, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_index < self.metadata.total_frames {
            let index = self.next_index;
            self.next_index += self.sampler.stride;
            self.attempts += 1;

            let frame = match self.source.read_frame(index) {
                Ok(Some(frame)) if !frame.is_empty() => frame,
                Ok(_) => {
                    log::warn!("Frame {index}: no image decoded, skipping");
                    self.skipped += 1;
                    continue;
                }
                Err(e) => {
                    log::warn!("Frame {index}: decode failed ({e}), skipping");
                    self.skipped += 1;
                    continue;
                }
            };

            let path = self.frame_path(index);
            if let Err(e) = self
                .sampler
                .image_writer
                .write(&path, &frame, self.sampler.size)
            {
                return Some(Err(PipelineError::FrameWrite {
                    index,
                    path,
                    reason: e.to_string(),
                }));
            }

            return Some(Ok(VideoFrame::new(self.metadata.timestamp_of(index), path)));
        }
        None
    }
}

impl Drop for SampledFrames<'_> {
    fn drop(&mut self) {
        self.source.close();
    }
}
