//! Typed inputs and outputs of the evaluation engine.
//!
//! `ModelConfig` and `Task` are loaded once per run and are read-only to the
//! engine. `EvaluationResult` is what the cache and the result store persist;
//! scoring and leaderboard types are derived from it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Answer type graded by case-insensitive exact match instead of the judge.
pub const EXACT_MATCH: &str = "exact_match";

/// Answer type assumed when a question does not carry one.
pub const SHORT_ANSWER: &str = "short_answer";

fn default_answer_type() -> String {
    SHORT_ANSWER.to_string()
}

/// Backend family a model is served by.
///
/// Unknown provider tags are preserved so the registry still loads; they are
/// dispatched to an adapter that reports "not implemented".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Provider {
    OpenAi,
    VertexAi,
    Unsupported(String),
}

impl Provider {
    pub fn as_str(&self) -> &str {
        match self {
            Self::OpenAi => "openai",
            Self::VertexAi => "vertexai",
            Self::Unsupported(tag) => tag,
        }
    }
}

impl From<String> for Provider {
    fn from(tag: String) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "openai" => Self::OpenAi,
            "vertexai" | "vertex" => Self::VertexAi,
            _ => Self::Unsupported(tag),
        }
    }
}

impl From<Provider> for String {
    fn from(provider: Provider) -> Self {
        provider.as_str().to_string()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the model registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    pub provider: Provider,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Credential reference such as `env:OPENAI_API_KEY`; never the secret itself.
    #[serde(default)]
    pub auth: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Transport override (proxies, gateways, test servers).
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ModelConfig {
    /// Provider-side model name.
    ///
    /// Resolution order: explicit `model`, then the part of `endpoint` after a
    /// `provider:` prefix (`openai:gpt-4o` -> `gpt-4o`), then the registry id.
    pub fn model_name(&self) -> &str {
        if let Some(model) = self.model.as_deref().filter(|m| !m.trim().is_empty()) {
            return model;
        }
        if let Some(endpoint) = self.endpoint.as_deref() {
            return match endpoint.split_once(':') {
                Some((_, name)) if !name.starts_with("//") && !name.is_empty() => name,
                _ => endpoint,
            };
        }
        &self.id
    }
}

/// A single question about a map, with its reference answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "q")]
    pub text: String,
    #[serde(rename = "a", default)]
    pub expected: String,
    #[serde(rename = "type", default = "default_answer_type")]
    pub answer_type: String,
}

/// A map plus an ordered list of questions.
///
/// Question order is significant: it drives prompt numbering and answer
/// alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    /// Image path, relative to the tasks directory.
    pub map_image: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(rename = "type", default)]
    pub task_type: Option<String>,
}

impl Task {
    pub fn image_path(&self, root: &Path) -> PathBuf {
        root.join(&self.map_image)
    }
}

/// A produced answer aligned with the question it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub expected: String,
    pub model_answer: String,
    #[serde(rename = "type", default = "default_answer_type")]
    pub answer_type: String,
}

/// Outcome of running one model on one task.
///
/// Invariant: `error` set means `answers` is empty; otherwise `answers` has
/// exactly one slot per task question, in question order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub model_id: String,
    pub task_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Seconds spent in the provider dispatch.
    #[serde(default)]
    pub execution_time: Option<f64>,
    /// Estimated USD cost from the static price table.
    #[serde(default)]
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

impl EvaluationResult {
    pub fn failed(model_id: &str, task_id: &str, error: impl Into<String>) -> Self {
        Self {
            model_id: model_id.to_string(),
            task_id: task_id.to_string(),
            timestamp: Utc::now(),
            answers: Vec::new(),
            raw_response: None,
            error: Some(error.into()),
            execution_time: None,
            estimated_cost: None,
            input_tokens: None,
            output_tokens: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    RuleBased,
    Judge,
    Similarity,
}

/// Grade of a single answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub task_id: String,
    pub model_id: String,
    pub question: String,
    pub expected_answer: String,
    pub model_answer: String,
    /// In `[0, 1]`.
    pub score: f64,
    pub explanation: String,
    pub scoring_method: ScoringMethod,
}

/// Per-model fold of individual scores.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateScore {
    /// Flat mean over every answer, not a mean of task means.
    pub overall: f64,
    pub by_task: BTreeMap<String, f64>,
    pub total_questions: usize,
}

/// One leaderboard row. Task columns serialize as `score_<task_id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub model_id: String,
    /// Percentage, rounded to two decimals.
    pub overall_score: f64,
    pub total_questions: usize,
    pub avg_execution_time: Option<f64>,
    pub total_cost: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub last_updated: DateTime<Utc>,
    #[serde(flatten)]
    pub task_scores: BTreeMap<String, f64>,
}

impl LeaderboardEntry {
    pub const TASK_COLUMN_PREFIX: &'static str = "score_";

    pub fn task_score(&self, task_id: &str) -> Option<f64> {
        self.task_scores
            .get(&format!("{}{}", Self::TASK_COLUMN_PREFIX, task_id))
            .copied()
    }
}

/// Everything one model produced during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub model_id: String,
    pub timestamp: DateTime<Utc>,
    pub aggregate_scores: AggregateScore,
    /// Failed pairs included, carrying their error and no scores.
    pub detailed_results: Vec<EvaluationResult>,
    pub detailed_scores: Vec<ScoringResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub timestamp: DateTime<Utc>,
    pub num_models: usize,
    pub num_tasks: usize,
    pub task_ids: Vec<String>,
    pub model_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub detailed_results: Vec<ModelEvaluation>,
    pub evaluation_metadata: RunMetadata,
}
