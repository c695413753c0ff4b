use std::path::Path;

use crate::shared::frame::Frame;

/// Persists a frame as an image file at a fixed output size.
pub trait ImageWriter: Send {
    /// Writes `frame` to `path`, resized to `size` (`width`, `height`) when
    /// its dimensions differ. The parent directory must already exist.
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        size: (u32, u32),
    ) -> Result<(), Box<dyn std::error::Error>>;
}
