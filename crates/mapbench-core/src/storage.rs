//! Durable result store.
//!
//! ```text
//! data/results/
//!   raw/{model}_{task}_{ts}_{us}.json  # every dispatched pair, success or error
//!   eval_{model}_{ts}.json           # ModelEvaluation
//!   leaderboard_{ts}.json            # ranked LeaderboardEntry rows
//!   leaderboard_latest.json          # copy of the most recent leaderboard file
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;
use tracing::{debug, info};

use crate::cache::sanitize_component;
use crate::errors::{StoreError, StoreResult};
use crate::model::{BenchmarkRun, EvaluationResult, LeaderboardEntry, ModelEvaluation};

pub const LATEST_LEADERBOARD: &str = "leaderboard_latest.json";
const RAW_DIR: &str = "raw";

fn stamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%d_%H%M%S").to_string()
}

/// Raw records need sub-second names: forced re-dispatches of one pair can
/// land within the same second.
fn precise_stamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%d_%H%M%S_%6f").to_string()
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    results_dir: PathBuf,
}

impl ResultStore {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io {
                    path: parent.to_path_buf(),
                    message: e.to_string(),
                })?;
        }
        let body = serde_json::to_string_pretty(value).map_err(|e| StoreError::Serialize {
            message: e.to_string(),
        })?;

        let mut temp_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);

        fs::write(&temp_path, body)
            .await
            .map_err(|e| StoreError::Io {
                path: temp_path.clone(),
                message: e.to_string(),
            })?;
        fs::rename(&temp_path, path)
            .await
            .map_err(|e| StoreError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        debug!(path = %path.display(), "wrote result file");
        Ok(())
    }

    /// Persist one dispatched pair.
    pub async fn record_result(&self, result: &EvaluationResult) -> StoreResult<PathBuf> {
        let name = format!(
            "{}_{}_{}.json",
            sanitize_component(&result.model_id),
            sanitize_component(&result.task_id),
            precise_stamp(result.timestamp)
        );
        let path = self.results_dir.join(RAW_DIR).join(name);
        self.write_json(&path, result).await?;
        Ok(path)
    }

    pub async fn save_evaluation(&self, evaluation: &ModelEvaluation) -> StoreResult<PathBuf> {
        let name = format!(
            "eval_{}_{}.json",
            sanitize_component(&evaluation.model_id),
            stamp(evaluation.timestamp)
        );
        let path = self.results_dir.join(name);
        self.write_json(&path, evaluation).await?;
        Ok(path)
    }

    /// Write a run's evaluations and its leaderboard, then refresh the
    /// latest-leaderboard copy. Returns the timestamped leaderboard path.
    pub async fn save_run(&self, run: &BenchmarkRun) -> StoreResult<PathBuf> {
        for evaluation in &run.detailed_results {
            self.save_evaluation(evaluation).await?;
        }

        let path = self.results_dir.join(format!(
            "leaderboard_{}.json",
            stamp(run.evaluation_metadata.timestamp)
        ));
        self.write_json(&path, &run.leaderboard).await?;
        self.write_json(&self.results_dir.join(LATEST_LEADERBOARD), &run.leaderboard)
            .await?;

        info!(
            path = %path.display(),
            models = run.leaderboard.len(),
            "saved leaderboard"
        );
        Ok(path)
    }

    /// The most recently saved leaderboard, if any.
    pub async fn latest_leaderboard(&self) -> StoreResult<Option<Vec<LeaderboardEntry>>> {
        let path = self.results_dir.join(LATEST_LEADERBOARD);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Io {
                    path,
                    message: e.to_string(),
                })
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Serialize {
                message: format!("{}: {}", path.display(), e),
            })
    }
}
