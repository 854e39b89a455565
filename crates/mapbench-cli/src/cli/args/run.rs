//! `mapbench run` arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Clone, Debug)]
pub struct RunArgs {
    /// Model ids to evaluate (default: every registered model)
    #[arg(long, value_delimiter = ',', env = "MAPBENCH_MODELS")]
    pub models: Option<Vec<String>>,

    /// Task ids to evaluate (default: every task file)
    #[arg(long, value_delimiter = ',', env = "MAPBENCH_TASKS")]
    pub tasks: Option<Vec<String>>,

    /// Evaluate a random sample of this many tasks
    #[arg(long)]
    pub limit: Option<usize>,

    /// Seed for --limit sampling
    #[arg(long, requires = "limit")]
    pub seed: Option<u64>,

    /// Results directory (default: <data-dir>/results)
    #[arg(long, env = "MAPBENCH_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Neither read nor write the result cache
    #[arg(long, conflicts_with = "force_refresh")]
    pub no_cache: bool,

    /// Ignore cached results but write fresh ones back
    #[arg(long)]
    pub force_refresh: bool,

    /// Provider calls in flight at once, across all models
    #[arg(long, default_value_t = mapbench_core::config::DEFAULT_MAX_CONCURRENCY, env = "MAPBENCH_MAX_CONCURRENCY")]
    pub max_concurrency: usize,

    /// Per-dispatch timeout in seconds
    #[arg(long, env = "MAPBENCH_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Grade free-form answers by word overlap instead of a judge model
    #[arg(long)]
    pub no_judge: bool,

    /// Judge model identifier
    #[arg(long, env = "MAPBENCH_JUDGE_MODEL", conflicts_with = "no_judge")]
    pub judge_model: Option<String>,

    /// Print cache statistics and exit
    #[arg(long)]
    pub cache_stats: bool,
}
