use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::RESOURCES_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("asset {name} not found (searched {searched:?}) and downloads are disabled")]
    NotFound { name: String, searched: Vec<PathBuf> },
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write asset to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Where to look for a model asset and whether fetching it is allowed.
pub struct AssetSource<'a> {
    pub name: &'a str,
    pub url: &'a str,
    /// Deployment directory checked first. Defaults to [`bundled_dir`].
    pub bundled_dir: Option<PathBuf>,
    pub allow_download: bool,
}

/// Resolve an asset by name.
///
/// Resolution order:
/// 1. Bundled directory (deployment `Resources/`, or an explicit override)
/// 2. User cache directory (platform-specific)
/// 3. Download from URL into the cache, if allowed
pub fn resolve(
    source: &AssetSource<'_>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let mut searched = Vec::new();

    if let Some(dir) = source.bundled_dir.clone().or_else(bundled_dir) {
        let bundled_path = dir.join(source.name);
        if bundled_path.is_file() {
            return Ok(bundled_path);
        }
        searched.push(bundled_path);
    }

    let cache_dir = model_cache_dir()?;
    let cached_path = cache_dir.join(source.name);
    if cached_path.is_file() {
        return Ok(cached_path);
    }
    searched.push(cached_path.clone());

    if !source.allow_download {
        return Err(ModelResolveError::NotFound {
            name: source.name.to_string(),
            searched,
        });
    }

    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {} from {}", source.name, source.url);
    download(source.url, &cached_path, progress)?;
    Ok(cached_path)
}

/// `Resources/` beside the running executable.
pub fn bundled_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(RESOURCES_DIR_NAME)))
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FrameSift/models/`
/// - Linux: `$XDG_CACHE_HOME/FrameSift/models/` or `~/.cache/FrameSift/models/`
/// - Windows: `%LOCALAPPDATA%/FrameSift/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("FrameSift").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("FrameSift").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = stream_to_file(url, dest, &temp_path, progress);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn stream_to_file(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let write_err = |source| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source,
    };

    let mut file = fs::File::create(temp_path).map_err(write_err)?;
    let mut downloaded: u64 = 0;
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}
