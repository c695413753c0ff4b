use std::path::{Path, PathBuf};

/// A sampled frame persisted to the run's scratch directory.
///
/// The image file belongs to the pipeline run and disappears with its
/// scratch directory.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoFrame {
    timestamp_seconds: f64,
    image_path: PathBuf,
}

impl VideoFrame {
    pub fn new(timestamp_seconds: f64, image_path: PathBuf) -> Self {
        Self {
            timestamp_seconds,
            image_path,
        }
    }

    pub fn timestamp_seconds(&self) -> f64 {
        self.timestamp_seconds
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }
}
