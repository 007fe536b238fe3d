//! Async file helpers. Every failure carries the path that was attempted.

use std::path::Path;

use noteharvest_shared::{HarvestError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Write `content` to a sibling temp file, then rename it over `path`.
pub(crate) async fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| HarvestError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    tokio::fs::write(&temp, content)
        .await
        .map_err(|e| HarvestError::io(&temp, e))?;
    tokio::fs::rename(&temp, path)
        .await
        .map_err(|e| HarvestError::io(path, e))?;

    debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}

/// Write a JSON file (pretty-printed).
pub(crate) async fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(|e| {
        HarvestError::validation(format!("JSON serialization failed for {}: {e}", path.display()))
    })?;
    write_atomic(path, &json).await
}

/// Read and parse a JSON file.
///
/// Content that is not valid UTF-8 JSON becomes [`HarvestError::CacheRead`];
/// only failures to open or read the file are [`HarvestError::Io`].
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| HarvestError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| HarvestError::CacheRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Whether a path exists. Errors other than "not found" count as absent.
pub(crate) async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
