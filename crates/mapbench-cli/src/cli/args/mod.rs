use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod cache;
pub mod run;
pub use cache::*;
pub use run::*;

#[derive(Parser)]
#[command(
    name = "mapbench",
    version,
    about = "Benchmark vision models on map-interpretation questions"
)]
pub struct Cli {
    /// Root holding models.yaml, tasks/, cache/ and results/
    #[arg(long, global = true, default_value = "data", env = "MAPBENCH_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Log output format (RUST_LOG still controls the level)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, env = "MAPBENCH_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate models on tasks and print the leaderboard
    Run(RunArgs),
    /// Inspect or prune the result cache
    Cache(CacheArgs),
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
