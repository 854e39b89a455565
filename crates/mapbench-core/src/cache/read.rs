//! Cache read path. Every failure here degrades to a miss.

use std::collections::BTreeMap;

use chrono::Utc;
use tokio::fs;
use tracing::{debug, warn};

use crate::model::{EvaluationResult, ModelConfig, Task};

use super::evict::purge_locked;
use super::{io, keys, policy, CacheStats, ResultCache};

fn decode(content: &str, model: &ModelConfig, task: &Task) -> Result<EvaluationResult, String> {
    let result: EvaluationResult =
        serde_json::from_str(content).map_err(|e| format!("unparseable result: {}", e))?;
    if result.model_id != model.id || result.task_id != task.id {
        return Err(format!(
            "result belongs to {}/{}",
            result.model_id, result.task_id
        ));
    }
    Ok(result)
}

pub(crate) async fn get_impl(
    cache: &ResultCache,
    model: &ModelConfig,
    task: &Task,
) -> Option<EvaluationResult> {
    let key = keys::derive_key(cache, model, task).await;
    let path = keys::entry_path(&cache.cache_dir, &key);
    let model_id = model.id.as_str();
    let task_id = task.id.as_str();

    let mut index = cache.index.lock().await;

    let Some(entry) = index.entries.get(&key).cloned() else {
        if fs::try_exists(&path).await.unwrap_or(false) {
            warn!(model_id, task_id, cache_key = %key, "result file without index entry, discarding");
            io::remove_quietly(&path).await;
        }
        debug!(model_id, task_id, "cache miss");
        return None;
    };

    if policy::is_expired(entry.created, Utc::now(), cache.ttl) {
        debug!(model_id, task_id, created = %entry.created, "cache entry expired");
        purge_locked(cache, &mut index, &key).await;
        return None;
    }

    let content = match fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) => {
            warn!(model_id, task_id, error = %e, "cached result unreadable, discarding entry");
            purge_locked(cache, &mut index, &key).await;
            return None;
        }
    };

    match decode(&content, model, task) {
        Ok(result) => {
            debug!(model_id, task_id, "cache hit");
            Some(result)
        }
        Err(reason) => {
            warn!(model_id, task_id, %reason, "corrupt cache entry, discarding");
            purge_locked(cache, &mut index, &key).await;
            None
        }
    }
}

pub(crate) async fn stats_impl(cache: &ResultCache) -> CacheStats {
    let index = cache.index.lock().await;

    let mut total_bytes = 0u64;
    let mut by_model: BTreeMap<String, usize> = BTreeMap::new();
    for (key, entry) in &index.entries {
        let path = keys::entry_path(&cache.cache_dir, key);
        total_bytes += match fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };
        *by_model.entry(entry.model_id.clone()).or_default() += 1;
    }

    CacheStats {
        version: cache.version.clone(),
        entry_count: index.entries.len(),
        total_bytes,
        by_model,
        cache_dir: cache.cache_dir.clone(),
    }
}
