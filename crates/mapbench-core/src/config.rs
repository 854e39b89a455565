//! Run configuration, the model registry and task loading.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::{debug, info};

use crate::cache::DEFAULT_TTL_DAYS;
use crate::errors::{ConfigError, ConfigResult};
use crate::model::{ModelConfig, Task};
use crate::providers::{adapter_for, ProviderAdapter};

pub use crate::judge::JudgeSettings;

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchPaths {
    pub models_file: PathBuf,
    /// Task JSON files; also the root `map_image` paths are resolved against.
    pub tasks_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl Default for BenchPaths {
    fn default() -> Self {
        Self::under(Path::new("data"))
    }
}

impl BenchPaths {
    /// The standard layout below `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            models_file: root.join("models.yaml"),
            tasks_dir: root.join("tasks"),
            cache_dir: root.join("cache"),
            results_dir: root.join("results"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub use_cache: bool,
    /// Skip cache reads; fresh results are still written back.
    pub force_refresh: bool,
    /// Upper bound on provider dispatches in flight, across all models.
    pub max_concurrency: usize,
    pub dispatch_timeout: Option<Duration>,
    pub cache_ttl: chrono::Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_refresh: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            dispatch_timeout: None,
            cache_ttl: chrono::Duration::days(DEFAULT_TTL_DAYS),
        }
    }
}

/// A model plus the adapter chosen for it at load time.
#[derive(Clone)]
pub struct RegisteredModel {
    pub config: ModelConfig,
    pub adapter: Arc<dyn ProviderAdapter>,
}

#[derive(Deserialize)]
struct RegistryFile {
    #[serde(default)]
    models: Vec<ModelConfig>,
}

/// Models in registry file order.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: Vec<RegisteredModel>,
}

impl ModelRegistry {
    pub fn from_configs(configs: Vec<ModelConfig>, http: reqwest::Client) -> ConfigResult<Self> {
        let mut registry = Self::default();
        for config in configs {
            let adapter = adapter_for(&config.provider, http.clone());
            registry.insert(config, adapter)?;
        }
        Ok(registry)
    }

    pub fn load(path: &Path, http: reqwest::Client) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::MissingFile {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }
        })?;
        let file: RegistryFile =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let registry = Self::from_configs(file.models, http)?;
        info!(path = %path.display(), models = registry.len(), "loaded model registry");
        Ok(registry)
    }

    /// Register a model with an explicit adapter.
    pub fn insert(
        &mut self,
        config: ModelConfig,
        adapter: Arc<dyn ProviderAdapter>,
    ) -> ConfigResult<()> {
        if config.id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "model id must not be empty".to_string(),
            });
        }
        if self.models.iter().any(|m| m.config.id == config.id) {
            return Err(ConfigError::DuplicateId {
                kind: "model",
                id: config.id,
            });
        }
        self.models.push(RegisteredModel { config, adapter });
        Ok(())
    }

    pub fn get(&self, model_id: &str) -> ConfigResult<&RegisteredModel> {
        self.models
            .iter()
            .find(|m| m.config.id == model_id)
            .ok_or_else(|| ConfigError::UnknownModel {
                model_id: model_id.to_string(),
            })
    }

    pub fn ids(&self) -> Vec<String> {
        self.models.iter().map(|m| m.config.id.clone()).collect()
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelConfig> {
        self.models.iter().map(|m| &m.config)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Which tasks a run loads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSelection {
    pub ids: Option<Vec<String>>,
    /// Random sample size, drawn without replacement.
    pub limit: Option<usize>,
    pub seed: Option<u64>,
}

fn read_task(path: &Path) -> ConfigResult<Task> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load `*.json` task files from `dir` in file-name order, then apply `selection`.
///
/// Sampling keeps the original relative order of the tasks it picks.
pub fn load_tasks(dir: &Path, selection: &TaskSelection) -> ConfigResult<Vec<Task>> {
    let entries = std::fs::read_dir(dir).map_err(|_| ConfigError::MissingFile {
        path: dir.to_path_buf(),
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    files.sort();

    let mut tasks = Vec::with_capacity(files.len());
    let mut seen = HashSet::new();
    for path in &files {
        let task = read_task(path)?;
        if !seen.insert(task.id.clone()) {
            return Err(ConfigError::DuplicateId {
                kind: "task",
                id: task.id,
            });
        }
        tasks.push(task);
    }

    if let Some(ids) = &selection.ids {
        if let Some(missing) = ids.iter().find(|id| !seen.contains(*id)) {
            return Err(ConfigError::Invalid {
                message: format!("task {} not found in {}", missing, dir.display()),
            });
        }
        tasks.retain(|t| ids.contains(&t.id));
    }

    if let Some(limit) = selection.limit {
        if limit < tasks.len() {
            let mut rng = match selection.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mut picked = rand::seq::index::sample(&mut rng, tasks.len(), limit).into_vec();
            picked.sort_unstable();
            let mut slots: Vec<Option<Task>> = tasks.into_iter().map(Some).collect();
            tasks = picked.into_iter().filter_map(|i| slots[i].take()).collect();
        }
    }

    debug!(dir = %dir.display(), count = tasks.len(), "loaded tasks");
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Provider;
    use tempfile::TempDir;

    fn write_task(dir: &Path, file: &str, id: &str) {
        let body = serde_json::json!({
            "id": id,
            "map_image": format!("{id}.png"),
            "questions": [{"q": "Q?", "a": "A"}]
        });
        std::fs::write(dir.join(file), body.to_string()).unwrap();
    }

    fn task_dir(n: usize) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for i in 0..n {
            write_task(tmp.path(), &format!("{i:02}.json"), &format!("task-{i}"));
        }
        tmp
    }

    #[test]
    fn registry_yaml_loads_in_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("models.yaml");
        std::fs::write(
            &path,
            r#"
models:
  - id: gpt-4o
    provider: openai
    endpoint: openai:gpt-4o
    auth: env:OPENAI_API_KEY
  - id: gemini-pro
    provider: vertexai
    endpoint: vertexai:gemini-1.5-pro
    region: us-central1
  - id: claude
    provider: anthropic
"#,
        )
        .unwrap();

        let registry = ModelRegistry::load(&path, reqwest::Client::new()).unwrap();
        assert_eq!(registry.ids(), vec!["gpt-4o", "gemini-pro", "claude"]);
        assert_eq!(registry.get("gemini-pro").unwrap().adapter.provider_name(), "vertexai");
        assert_eq!(
            registry.get("claude").unwrap().config.provider,
            Provider::Unsupported("anthropic".into())
        );
        assert!(matches!(
            registry.get("nope"),
            Err(ConfigError::UnknownModel { .. })
        ));
    }

    #[test]
    fn missing_registry_is_a_config_error() {
        let err = ModelRegistry::load(Path::new("/nonexistent/models.yaml"), reqwest::Client::new())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn duplicate_model_ids_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("models.yaml");
        std::fs::write(
            &path,
            "models:\n  - {id: a, provider: openai}\n  - {id: a, provider: openai}\n",
        )
        .unwrap();
        let err = ModelRegistry::load(&path, reqwest::Client::new()).err().unwrap();
        assert!(matches!(err, ConfigError::DuplicateId { kind: "model", .. }));
    }

    #[test]
    fn tasks_load_in_file_name_order() {
        let tmp = TempDir::new().unwrap();
        write_task(tmp.path(), "b.json", "second");
        write_task(tmp.path(), "a.json", "first");
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let tasks = load_tasks(tmp.path(), &TaskSelection::default()).unwrap();
        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn id_subset_and_unknown_ids() {
        let tmp = task_dir(3);
        let selection = TaskSelection {
            ids: Some(vec!["task-2".into(), "task-0".into()]),
            ..TaskSelection::default()
        };
        let ids: Vec<_> = load_tasks(tmp.path(), &selection)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["task-0", "task-2"]);

        let selection = TaskSelection {
            ids: Some(vec!["task-9".into()]),
            ..TaskSelection::default()
        };
        assert!(matches!(
            load_tasks(tmp.path(), &selection),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn seeded_sample_is_reproducible_and_ordered() {
        let tmp = task_dir(10);
        let selection = TaskSelection {
            ids: None,
            limit: Some(4),
            seed: Some(7),
        };
        let a: Vec<_> = load_tasks(tmp.path(), &selection)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        let b: Vec<_> = load_tasks(tmp.path(), &selection)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(a.len(), 4);
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(a, sorted);
        let unique: HashSet<_> = a.iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn limit_above_count_keeps_everything() {
        let tmp = task_dir(2);
        let selection = TaskSelection {
            limit: Some(5),
            ..TaskSelection::default()
        };
        assert_eq!(load_tasks(tmp.path(), &selection).unwrap().len(), 2);
    }

    #[test]
    fn malformed_task_names_the_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("bad.json"), "{ nope").unwrap();
        let err = load_tasks(tmp.path(), &TaskSelection::default()).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}
