//! Cached downloads for local engine assets (ocrs models, tessdata)

use crate::error::MeterError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Per-user cache directory for engine assets
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("meter-ocr")
}

/// Return `dir/filename`, downloading it from `url` first if it is missing
pub fn ensure_cached(url: &str, dir: &Path, filename: &str) -> Result<PathBuf, MeterError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        MeterError::InitializationError(format!("Failed to create {}: {}", dir.display(), e))
    })?;

    let path = dir.join(filename);
    if path.exists() {
        tracing::info!("Using cached {} from {:?}", filename, path);
        return Ok(path);
    }

    tracing::info!("Downloading {} (this may take a moment)...", filename);
    download_file(url, &path)?;
    tracing::info!("Downloaded {} to {:?}", filename, path);

    Ok(path)
}

/// Download into a sibling temp file and rename, so an interrupted
/// download never leaves a truncated asset behind.
fn download_file(url: &str, path: &Path) -> Result<(), MeterError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| MeterError::InitializationError(format!("Failed to download {}: {}", url, e)))?;

    let partial = path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        MeterError::InitializationError(format!("Failed to create {}: {}", partial.display(), e))
    })?;

    // Stream to disk; the recognition model is larger than ureq's in-memory body limit
    let mut body = response.into_body().into_reader();
    std::io::copy(&mut body, &mut file).map_err(|e| {
        MeterError::InitializationError(format!("Failed to write {}: {}", partial.display(), e))
    })?;
    file.flush().map_err(|e| {
        MeterError::InitializationError(format!("Failed to write {}: {}", partial.display(), e))
    })?;

    std::fs::rename(&partial, path).map_err(|e| {
        MeterError::InitializationError(format!("Failed to move {}: {}", path.display(), e))
    })
}
