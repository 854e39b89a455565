//! Removal paths: single-entry purge, scoped invalidation, full clear.

use tokio::fs;
use tracing::{info, warn};

use crate::errors::{CacheError, CacheResult};

use super::{io, keys, CacheEntry, CacheIndex, ResultCache, METADATA_FILE};

/// Drop one entry and its file while the index lock is held.
///
/// Index persistence failures are logged; the entry is gone from memory
/// either way and its file no longer exists.
pub(crate) async fn purge_locked(cache: &ResultCache, index: &mut CacheIndex, key: &str) {
    io::remove_quietly(&keys::entry_path(&cache.cache_dir, key)).await;
    if index.entries.remove(key).is_some() {
        if let Err(e) = io::persist_index(&cache.cache_dir, index).await {
            warn!(cache_key = key, error = %e, "failed to persist cache index after purge");
        }
    }
}

pub(crate) async fn invalidate_where<F>(cache: &ResultCache, matches: F) -> CacheResult<usize>
where
    F: Fn(&CacheEntry) -> bool,
{
    let mut index = cache.index.lock().await;

    let doomed: Vec<String> = index
        .entries
        .iter()
        .filter(|(_, entry)| matches(entry))
        .map(|(key, _)| key.clone())
        .collect();

    if doomed.is_empty() {
        return Ok(0);
    }

    for key in &doomed {
        io::remove_quietly(&keys::entry_path(&cache.cache_dir, key)).await;
        index.entries.remove(key);
    }
    io::persist_index(&cache.cache_dir, &index).await?;

    info!(removed = doomed.len(), "invalidated cache entries");
    Ok(doomed.len())
}

pub(crate) async fn clear_impl(cache: &ResultCache) -> CacheResult<()> {
    let mut index = cache.index.lock().await;

    let mut dir = fs::read_dir(&cache.cache_dir)
        .await
        .map_err(|e| CacheError::Io {
            message: format!("failed to read cache directory: {}", e),
        })?;

    let mut removed = 0usize;
    while let Some(entry) = dir.next_entry().await.map_err(|e| CacheError::Io {
        message: format!("failed to read cache directory: {}", e),
    })? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name == METADATA_FILE {
            continue;
        }
        if name.ends_with(".json") || name.ends_with(".tmp") {
            io::remove_quietly(&entry.path()).await;
            removed += 1;
        }
    }

    *index = CacheIndex::fresh(&cache.version);
    io::persist_index(&cache.cache_dir, &index).await?;

    info!(removed, "cache cleared");
    Ok(())
}
