use std::path::{Path, PathBuf};

use tokio::fs;

use crate::fingerprint::{cache_key, image_digest, model_fingerprint, task_fingerprint};
use crate::model::{ModelConfig, Task};

use super::ResultCache;

/// Characters outside `[A-Za-z0-9._-]` become `-`.
pub(crate) fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// File name for a cache key.
pub fn entry_file_name(key: &str) -> String {
    format!("{}.json", sanitize_component(key))
}

pub(crate) fn entry_path(cache_dir: &Path, key: &str) -> PathBuf {
    cache_dir.join(entry_file_name(key))
}

/// Digest of the task image, or `None` when it cannot be read.
async fn task_image_digest(image_root: &Path, task: &Task) -> Option<String> {
    fs::read(task.image_path(image_root))
        .await
        .ok()
        .map(|bytes| image_digest(&bytes))
}

pub(crate) async fn derive_key(cache: &ResultCache, model: &ModelConfig, task: &Task) -> String {
    let image = task_image_digest(&cache.image_root, task).await;
    cache_key(
        &cache.version,
        model,
        &model_fingerprint(model),
        task,
        &task_fingerprint(task, image.as_deref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(
            entry_file_name("v2.0_gpt-4o_abc_weather-madrid_def"),
            "v2.0_gpt-4o_abc_weather-madrid_def.json"
        );
        assert_eq!(
            entry_file_name("v2.0_org/model:latest_abc_t 1_def"),
            "v2.0_org-model-latest_abc_t-1_def.json"
        );
    }
}
