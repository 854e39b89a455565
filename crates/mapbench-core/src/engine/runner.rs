use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::cache::ResultCache;
use crate::config::{ModelRegistry, RunSettings};
use crate::errors::{ConfigResult, EvalResult};
use crate::model::{BenchmarkRun, EvaluationResult, ModelEvaluation, Task};
use crate::scoring::Scorer;
use crate::storage::ResultStore;

/// Where a pair's result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Cache,
    Live,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairOutcome {
    pub result: EvaluationResult,
    pub source: ResultSource,
}

/// Drives cache-check, dispatch and record for every (model, task) pair.
///
/// Cheap to clone; clones share the cache, the dispatch semaphore and the
/// judge.
#[derive(Clone)]
pub struct Evaluator {
    pub(crate) registry: Arc<ModelRegistry>,
    pub(crate) cache: Option<Arc<ResultCache>>,
    pub(crate) store: ResultStore,
    pub(crate) scorer: Scorer,
    pub(crate) settings: RunSettings,
    pub(crate) image_root: PathBuf,
    pub(crate) dispatch_permits: Arc<Semaphore>,
}

impl Evaluator {
    /// `cache` is ignored when `settings.use_cache` is false; otherwise it
    /// takes its TTL from `settings.cache_ttl`.
    pub fn new(
        registry: ModelRegistry,
        cache: Option<ResultCache>,
        store: ResultStore,
        scorer: Scorer,
        settings: RunSettings,
        image_root: impl Into<PathBuf>,
    ) -> Self {
        let cache = if settings.use_cache {
            cache.map(|c| Arc::new(c.with_ttl(settings.cache_ttl)))
        } else {
            None
        };
        let dispatch_permits = Arc::new(Semaphore::new(settings.max_concurrency.max(1)));
        Self {
            registry: Arc::new(registry),
            cache,
            store,
            scorer,
            settings,
            image_root: image_root.into(),
            dispatch_permits,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_deref()
    }

    /// Evaluate one model on one task. Only an unknown model id is an error;
    /// every runtime failure is captured on the returned result.
    pub async fn run_model(&self, model_id: &str, task: &Task) -> ConfigResult<PairOutcome> {
        super::execute::run_pair_impl(self, model_id, task).await
    }

    /// Evaluate one model on every task, in task order, and score the results.
    pub async fn evaluate_model(
        &self,
        model_id: &str,
        tasks: &[Task],
    ) -> ConfigResult<ModelEvaluation> {
        super::execute::evaluate_model_impl(self, model_id, tasks).await
    }

    /// Evaluate several models concurrently, rank them and persist the run.
    ///
    /// `model_ids` defaults to every registered model. Ids are validated
    /// before anything is dispatched.
    pub async fn evaluate_all(
        &self,
        model_ids: Option<&[String]>,
        tasks: &[Task],
    ) -> EvalResult<BenchmarkRun> {
        super::execute::evaluate_all_impl(self, model_ids, tasks).await
    }
}
