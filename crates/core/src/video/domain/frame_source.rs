use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Random-access frame decoder over a single video file.
///
/// Implementations hold decoder state that is not safe to share, so each
/// pipeline run opens its own source.
pub trait FrameSource: Send {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Seeks to `index` and decodes that frame.
    ///
    /// `Ok(None)` means the decoder produced nothing for this index (end of
    /// stream, or a gap); errors are per-frame and do not invalidate the
    /// source.
    fn read_frame(&mut self, index: usize) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases decoder resources. Safe to call more than once.
    fn close(&mut self);
}
