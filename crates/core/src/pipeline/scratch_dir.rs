use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::shared::constants::SCRATCH_DIR_PREFIX;
use crate::shared::error::PipelineError;

/// A run-unique scratch directory, removed recursively when released or
/// dropped.
///
/// `release` reports removal failures to the caller; dropping logs them.
/// Either way a failed removal never changes the outcome of the run.
pub struct ScratchDir {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl ScratchDir {
    /// Creates `root` if needed, then a fresh `framesift-run-*` directory
    /// inside it.
    pub fn allocate(root: &Path) -> Result<Self, PipelineError> {
        let scratch_error = |source: io::Error| PipelineError::Scratch {
            root: root.to_path_buf(),
            source,
        };
        fs::create_dir_all(root).map_err(scratch_error)?;
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_DIR_PREFIX)
            .tempdir_in(root)
            .map_err(scratch_error)?;
        log::debug!("Allocated scratch directory {}", dir.path().display());
        Ok(Self {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the directory and everything in it. A directory that is
    /// already gone counts as released.
    pub fn release(mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => remove(dir),
            None => Ok(()),
        }
    }
}

fn remove(dir: TempDir) -> io::Result<()> {
    let path = dir.path().to_path_buf();
    match dir.close() {
        Err(e) if e.kind() == io::ErrorKind::NotFound && !path.exists() => Ok(()),
        other => other,
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = remove(dir) {
                log::warn!(
                    "Failed to remove scratch directory {}: {e}",
                    self.path.display()
                );
            }
        }
    }
}
