use chrono::Utc;
use tracing::{debug, warn};

use crate::errors::{CacheError, CacheResult};
use crate::model::{EvaluationResult, ModelConfig, Task};

use super::{io, keys, CacheEntry, ResultCache};

pub(crate) async fn put_impl(
    cache: &ResultCache,
    model: &ModelConfig,
    task: &Task,
    result: &EvaluationResult,
) -> CacheResult<()> {
    let key = keys::derive_key(cache, model, task).await;
    let path = keys::entry_path(&cache.cache_dir, &key);

    let body = serde_json::to_string_pretty(result).map_err(|e| CacheError::Serialize {
        message: format!("failed to serialize result: {}", e),
    })?;

    let mut index = cache.index.lock().await;

    if let Err(e) = io::write_atomic_impl(&path, body.as_bytes()).await {
        // A failed rename may leave a previous entry's file half-replaced.
        io::remove_quietly(&path).await;
        if index.entries.remove(&key).is_some() {
            if let Err(persist_err) = io::persist_index(&cache.cache_dir, &index).await {
                warn!(error = %persist_err, "failed to persist cache index after write failure");
            }
        }
        return Err(e);
    }

    let previous = index.entries.insert(
        key.clone(),
        CacheEntry {
            created: Utc::now(),
            model_id: model.id.clone(),
            task_id: task.id.clone(),
            file_size: body.len() as u64,
        },
    );

    if let Err(e) = io::persist_index(&cache.cache_dir, &index).await {
        index.entries.remove(&key);
        io::remove_quietly(&path).await;
        if previous.is_some() {
            warn!(cache_key = %key, "dropped previous cache entry after index write failure");
        }
        return Err(e);
    }

    debug!(
        model_id = %model.id,
        task_id = %task.id,
        bytes = body.len(),
        "cached result"
    );
    Ok(())
}
