//! Content-addressable result cache.
//!
//! Maps a (model, task) fingerprint to a previously computed
//! [`EvaluationResult`] so unchanged pairs are never re-dispatched.
//!
//! # Cache Structure
//!
//! ```text
//! data/cache/
//!   cache_metadata.json          # index: {version, created, entries: {key: CacheEntry}}
//!   {sanitized cache key}.json   # serialized EvaluationResult
//! ```
//!
//! The index is held in memory and rewritten atomically (temp file + rename)
//! after every mutation. One `ResultCache` per directory is assumed; the
//! in-process mutex serializes writers but nothing coordinates separate
//! processes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::errors::CacheResult;
use crate::fingerprint::CACHE_VERSION;
use crate::model::{EvaluationResult, ModelConfig, Task};

mod evict;
mod io;
mod keys;
mod policy;
mod read;
mod write;

pub use keys::entry_file_name;
pub(crate) use keys::sanitize_component;
pub use policy::DEFAULT_TTL_DAYS;

pub const METADATA_FILE: &str = "cache_metadata.json";

/// Metadata recorded for one cached result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub created: DateTime<Utc>,
    pub model_id: String,
    pub task_id: String,
    pub file_size: u64,
}

/// On-disk index format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheIndex {
    pub version: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub entries: BTreeMap<String, CacheEntry>,
}

impl CacheIndex {
    fn fresh(version: &str) -> Self {
        Self {
            version: version.to_string(),
            created: Utc::now(),
            entries: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub version: String,
    pub entry_count: usize,
    pub total_bytes: u64,
    pub by_model: BTreeMap<String, usize>,
    pub cache_dir: PathBuf,
}

impl CacheStats {
    pub fn total_mb(&self) -> f64 {
        (self.total_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }
}

#[derive(Debug)]
pub struct ResultCache {
    cache_dir: PathBuf,
    /// Root for resolving `Task::map_image` when hashing image bytes.
    image_root: PathBuf,
    version: String,
    ttl: Duration,
    index: Mutex<CacheIndex>,
}

impl ResultCache {
    /// Open (or create) a cache directory and load its index.
    ///
    /// A missing or unreadable index starts the cache empty.
    pub async fn open(
        cache_dir: impl Into<PathBuf>,
        image_root: impl Into<PathBuf>,
    ) -> CacheResult<Self> {
        let cache_dir = cache_dir.into();
        io::ensure_dir(&cache_dir).await?;
        let index = io::load_index(&cache_dir, CACHE_VERSION).await;
        Ok(Self {
            cache_dir,
            image_root: image_root.into(),
            version: CACHE_VERSION.to_string(),
            ttl: Duration::days(DEFAULT_TTL_DAYS),
            index: Mutex::new(index),
        })
    }

    /// Override the version tag embedded in keys.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Cache key for a pair. Reads the task image to fold its digest in.
    pub async fn key_for(&self, model: &ModelConfig, task: &Task) -> String {
        keys::derive_key(self, model, task).await
    }

    /// Cached result for a pair, or `None`.
    ///
    /// Expired, orphaned and corrupt entries are purged and reported as a miss;
    /// this never fails.
    pub async fn get(&self, model: &ModelConfig, task: &Task) -> Option<EvaluationResult> {
        read::get_impl(self, model, task).await
    }

    /// Store a result. The metadata entry is recorded only after the result
    /// file is fully written.
    pub async fn put(
        &self,
        model: &ModelConfig,
        task: &Task,
        result: &EvaluationResult,
    ) -> CacheResult<()> {
        write::put_impl(self, model, task, result).await
    }

    /// Remove every entry recorded under `model_id`; returns the count removed.
    pub async fn invalidate_by_model(&self, model_id: &str) -> CacheResult<usize> {
        evict::invalidate_where(self, |entry| entry.model_id == model_id).await
    }

    /// Remove every entry recorded under `task_id`; returns the count removed.
    pub async fn invalidate_by_task(&self, task_id: &str) -> CacheResult<usize> {
        evict::invalidate_where(self, |entry| entry.task_id == task_id).await
    }

    pub async fn clear(&self) -> CacheResult<()> {
        evict::clear_impl(self).await
    }

    pub async fn stats(&self) -> CacheStats {
        read::stats_impl(self).await
    }

    /// Snapshot of the index.
    pub async fn entries(&self) -> BTreeMap<String, CacheEntry> {
        self.index.lock().await.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, Provider, Question};
    use tempfile::TempDir;

    fn model(id: &str) -> ModelConfig {
        ModelConfig {
            id: id.into(),
            provider: Provider::OpenAi,
            endpoint: Some(format!("openai:{id}")),
            model: None,
            region: None,
            auth: Some("env:OPENAI_API_KEY".into()),
            description: None,
            base_url: None,
        }
    }

    fn task(id: &str) -> Task {
        Task {
            id: id.into(),
            map_image: format!("{id}.png"),
            context: None,
            questions: vec![Question {
                text: "Capital?".into(),
                expected: "Paris".into(),
                answer_type: "exact_match".into(),
            }],
            task_type: None,
        }
    }

    fn result(model_id: &str, task_id: &str) -> EvaluationResult {
        EvaluationResult {
            model_id: model_id.into(),
            task_id: task_id.into(),
            timestamp: Utc::now(),
            answers: vec![Answer {
                question: "Capital?".into(),
                expected: "Paris".into(),
                model_answer: "Paris".into(),
                answer_type: "exact_match".into(),
            }],
            raw_response: Some("1. Paris".into()),
            error: None,
            execution_time: Some(1.5),
            estimated_cost: Some(0.25),
            input_tokens: Some(1200),
            output_tokens: Some(40),
        }
    }

    async fn create_test_cache() -> (ResultCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = ResultCache::open(temp_dir.path().join("cache"), temp_dir.path().join("tasks"))
            .await
            .unwrap();
        (cache, temp_dir)
    }

    #[tokio::test]
    async fn test_cache_roundtrip() {
        let (cache, _tmp) = create_test_cache().await;
        let (m, t, r) = (model("gpt-4o"), task("t1"), result("gpt-4o", "t1"));

        cache.put(&m, &t, &r).await.unwrap();
        assert_eq!(cache.get(&m, &t).await, Some(r));
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let (cache, _tmp) = create_test_cache().await;
        assert!(cache.get(&model("gpt-4o"), &task("t1")).await.is_none());
    }

    #[tokio::test]
    async fn test_index_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let (m, t, r) = (model("gpt-4o"), task("t1"), result("gpt-4o", "t1"));
        {
            let cache = ResultCache::open(tmp.path().join("cache"), tmp.path())
                .await
                .unwrap();
            cache.put(&m, &t, &r).await.unwrap();
        }
        let cache = ResultCache::open(tmp.path().join("cache"), tmp.path())
            .await
            .unwrap();
        assert_eq!(cache.get(&m, &t).await, Some(r));
    }

    #[tokio::test]
    async fn test_version_bump_misses() {
        let tmp = TempDir::new().unwrap();
        let (m, t, r) = (model("gpt-4o"), task("t1"), result("gpt-4o", "t1"));
        let cache = ResultCache::open(tmp.path().join("cache"), tmp.path())
            .await
            .unwrap();
        cache.put(&m, &t, &r).await.unwrap();

        let bumped = ResultCache::open(tmp.path().join("cache"), tmp.path())
            .await
            .unwrap()
            .with_version("v9.9");
        assert!(bumped.get(&m, &t).await.is_none());
    }

    #[tokio::test]
    async fn test_image_bytes_change_key() {
        let tmp = TempDir::new().unwrap();
        let tasks_dir = tmp.path().join("tasks");
        std::fs::create_dir_all(&tasks_dir).unwrap();
        let cache = ResultCache::open(tmp.path().join("cache"), &tasks_dir)
            .await
            .unwrap();
        let (m, t) = (model("gpt-4o"), task("t1"));

        let without_image = cache.key_for(&m, &t).await;
        std::fs::write(tasks_dir.join("t1.png"), b"\x89PNG-one").unwrap();
        let with_image = cache.key_for(&m, &t).await;
        std::fs::write(tasks_dir.join("t1.png"), b"\x89PNG-two").unwrap();
        let changed_image = cache.key_for(&m, &t).await;

        assert_ne!(without_image, with_image);
        assert_ne!(with_image, changed_image);
        assert_eq!(changed_image, cache.key_for(&m, &t).await);
    }

    #[tokio::test]
    async fn test_no_temp_files_remain() {
        let (cache, _tmp) = create_test_cache().await;
        cache
            .put(&model("gpt-4o"), &task("t1"), &result("gpt-4o", "t1"))
            .await
            .unwrap();

        for entry in std::fs::read_dir(cache.cache_dir()).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.ends_with(".tmp"), "temp file should not remain: {name}");
        }
    }

    #[tokio::test]
    async fn test_invalidate_scoping() {
        let (cache, _tmp) = create_test_cache().await;
        for (m, t) in [("gpt-x", "t1"), ("gpt-x", "t2"), ("gemini", "t1")] {
            cache.put(&model(m), &task(t), &result(m, t)).await.unwrap();
        }

        assert_eq!(cache.invalidate_by_model("gpt-x").await.unwrap(), 2);
        assert!(cache.get(&model("gpt-x"), &task("t1")).await.is_none());
        assert!(cache.get(&model("gemini"), &task("t1")).await.is_some());
        assert_eq!(cache.invalidate_by_model("gpt-x").await.unwrap(), 0);

        assert_eq!(cache.invalidate_by_task("t1").await.unwrap(), 1);
        assert_eq!(cache.stats().await.entry_count, 0);
    }

    #[tokio::test]
    async fn test_clear_and_stats() {
        let (cache, _tmp) = create_test_cache().await;
        cache
            .put(&model("a"), &task("t1"), &result("a", "t1"))
            .await
            .unwrap();
        cache
            .put(&model("a"), &task("t2"), &result("a", "t2"))
            .await
            .unwrap();
        cache
            .put(&model("b"), &task("t1"), &result("b", "t1"))
            .await
            .unwrap();

        let stats = cache.stats().await;
        assert_eq!(stats.entry_count, 3);
        assert_eq!(stats.by_model.get("a"), Some(&2));
        assert_eq!(stats.by_model.get("b"), Some(&1));
        assert!(stats.total_bytes > 0);
        assert_eq!(stats.version, CACHE_VERSION);

        cache.clear().await.unwrap();
        let stats = cache.stats().await;
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.total_bytes, 0);
        assert!(cache.cache_dir().join(METADATA_FILE).exists());
        let leftovers = std::fs::read_dir(cache.cache_dir()).unwrap().count();
        assert_eq!(leftovers, 1, "only the index should remain");
    }
}
