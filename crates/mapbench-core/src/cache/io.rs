//! Filesystem boundary for the result cache.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::errors::{CacheError, CacheResult};

use super::{CacheIndex, METADATA_FILE};

pub(crate) fn metadata_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(METADATA_FILE)
}

pub(crate) async fn ensure_dir(dir: &Path) -> CacheResult<()> {
    fs::create_dir_all(dir).await.map_err(|e| CacheError::Io {
        message: format!("failed to create cache directory {}: {}", dir.display(), e),
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write to a sibling temp file, then rename over `path`.
///
/// Readers never observe a half-written file. The temp file is removed when
/// either step fails.
pub(crate) async fn write_atomic_impl(path: &Path, content: &[u8]) -> CacheResult<()> {
    let temp_path = temp_path(path);

    if let Err(e) = fs::write(&temp_path, content).await {
        remove_quietly(&temp_path).await;
        return Err(CacheError::Io {
            message: format!("failed to write temp file: {}", e),
        });
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        remove_quietly(&temp_path).await;
        return Err(CacheError::Io {
            message: format!("failed to rename temp file: {}", e),
        });
    }

    Ok(())
}

/// Best-effort delete; a file that is already gone is not an error.
pub(crate) async fn remove_quietly(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove cache file"),
    }
}

pub(crate) async fn load_index(cache_dir: &Path, version: &str) -> CacheIndex {
    let path = metadata_path(cache_dir);
    let content = match fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(cache_dir = %cache_dir.display(), "no cache index, starting empty");
            return CacheIndex::fresh(version);
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read cache index, starting empty");
            return CacheIndex::fresh(version);
        }
    };

    match serde_json::from_str::<CacheIndex>(&content) {
        Ok(index) => index,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt cache index, starting empty");
            CacheIndex::fresh(version)
        }
    }
}

pub(crate) async fn persist_index(cache_dir: &Path, index: &CacheIndex) -> CacheResult<()> {
    let body = serde_json::to_string_pretty(index).map_err(|e| CacheError::Serialize {
        message: format!("failed to serialize cache index: {}", e),
    })?;
    write_atomic_impl(&metadata_path(cache_dir), body.as_bytes()).await
}
