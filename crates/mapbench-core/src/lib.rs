//! Cached, concurrent benchmark engine for map-interpretation question answering.
//!
//! Hosted vision models are asked every question of a task in one batched
//! request. Replies are parsed back into per-question answers, graded (rule,
//! judge model or word overlap), folded into per-model scores and ranked on
//! a leaderboard. Results are cached by content fingerprint, so re-running
//! an unchanged (model, task) pair costs nothing.
//!
//! # Quick Start
//!
//! ```no_run
//! use mapbench_core::{
//!     load_tasks, BenchPaths, Evaluator, ModelRegistry, ResultCache, ResultStore, RunSettings,
//!     Scorer, TaskSelection,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let paths = BenchPaths::default();
//! let http = reqwest::Client::new();
//! let registry = ModelRegistry::load(&paths.models_file, http)?;
//! let tasks = load_tasks(&paths.tasks_dir, &TaskSelection::default())?;
//! let cache = ResultCache::open(&paths.cache_dir, &paths.tasks_dir).await?;
//!
//! let evaluator = Evaluator::new(
//!     registry,
//!     Some(cache),
//!     ResultStore::new(&paths.results_dir),
//!     Scorer::default(),
//!     RunSettings::default(),
//!     &paths.tasks_dir,
//! );
//! let run = evaluator.evaluate_all(None, &tasks).await?;
//! println!("{}", mapbench_core::render_leaderboard(&run.leaderboard));
//! # Ok(())
//! # }
//! ```
//!
//! # Credentials
//!
//! Models name their credential indirectly (`auth: env:OPENAI_API_KEY`); the
//! secret is read from the environment at dispatch time and never stored.
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `OPENAI_API_KEY` | Default judge credential; usual OpenAI model credential |
//! | `VERTEX_PROJECT_ID` / `GOOGLE_CLOUD_PROJECT` | Project for Vertex AI endpoints |

pub mod cache;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fingerprint;
pub mod judge;
pub mod model;
pub mod providers;
pub mod report;
pub mod scoring;
pub mod storage;

pub use cache::{CacheEntry, CacheIndex, CacheStats, ResultCache};
pub use config::{
    load_tasks, BenchPaths, JudgeSettings, ModelRegistry, RegisteredModel, RunSettings,
    TaskSelection,
};
pub use engine::{Evaluator, PairOutcome, ResultSource};
pub use errors::{
    AuthError, CacheError, ConfigError, EvalError, ProviderError, StoreError, ConfigResult,
    EvalResult,
};
pub use fingerprint::CACHE_VERSION;
pub use judge::{Judge, JudgeVerdict};
pub use model::{
    AggregateScore, Answer, BenchmarkRun, EvaluationResult, LeaderboardEntry, ModelConfig,
    ModelEvaluation, Provider, Question, RunMetadata, ScoringMethod, ScoringResult, Task,
};
pub use providers::{adapter_for, ProviderAdapter};
pub use report::{build_leaderboard, render_cache_stats, render_leaderboard};
pub use scoring::{calculate_aggregate_score, Scorer};
pub use storage::ResultStore;
