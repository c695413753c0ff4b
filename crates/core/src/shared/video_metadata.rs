use std::path::PathBuf;

/// Properties of an opened video, as reported by the frame source.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Number of decodable frames (`N`). Estimated from the stream duration
    /// when the container does not record it.
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Presentation time of frame `index`, in seconds.
    pub fn timestamp_of(&self, index: usize) -> f64 {
        if self.fps > 0.0 {
            index as f64 / self.fps
        } else {
            0.0
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.timestamp_of(self.total_frames)
    }
}
