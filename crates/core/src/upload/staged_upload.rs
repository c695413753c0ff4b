use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::shared::constants::UPLOAD_FILE_PREFIX;
use crate::shared::error::PipelineError;

/// Rejects sizes above `limit`.
pub fn ensure_within_limit(size: u64, limit: u64) -> Result<(), PipelineError> {
    if size > limit {
        return Err(PipelineError::UploadTooLarge { size, limit });
    }
    Ok(())
}

/// A private copy of an uploaded video that the pipeline can read. The
/// copy is deleted when dropped; `discard` does the same but reports
/// failures.
pub struct StagedUpload {
    file: NamedTempFile,
    size: u64,
}

impl StagedUpload {
    /// Checks `source` against `ceiling` using filesystem metadata, then
    /// copies it into a uniquely named file under `staging_dir`.
    ///
    /// Oversized inputs are rejected before anything is created.
    pub fn stage(source: &Path, ceiling: u64, staging_dir: &Path) -> Result<Self, PipelineError> {
        let unavailable = |reason: String| PipelineError::SourceUnavailable {
            path: source.to_path_buf(),
            reason,
        };
        let metadata = fs::metadata(source).map_err(|e| unavailable(e.to_string()))?;
        if !metadata.is_file() {
            return Err(unavailable("not a regular file".into()));
        }
        ensure_within_limit(metadata.len(), ceiling)?;

        let staging_error = |e: io::Error| PipelineError::Scratch {
            root: staging_dir.to_path_buf(),
            source: e,
        };
        fs::create_dir_all(staging_dir).map_err(staging_error)?;

        let suffix = source
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let mut file = tempfile::Builder::new()
            .prefix(UPLOAD_FILE_PREFIX)
            .suffix(&suffix)
            .tempfile_in(staging_dir)
            .map_err(staging_error)?;

        let input = File::open(source).map_err(|e| unavailable(e.to_string()))?;
        // The source may still be growing; never copy more than the ceiling allows.
        let size = io::copy(&mut input.take(ceiling.saturating_add(1)), file.as_file_mut())
            .map_err(staging_error)?;
        ensure_within_limit(size, ceiling)?;

        log::debug!(
            "Staged {} ({size} bytes) at {}",
            source.display(),
            file.path().display()
        );
        Ok(Self { file, size })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn discard(self) -> io::Result<()> {
        let path: PathBuf = self.file.path().to_path_buf();
        self.file.close().map_err(|e| {
            log::warn!("Failed to delete staged upload {}: {e}", path.display());
            e
        })
    }
}
