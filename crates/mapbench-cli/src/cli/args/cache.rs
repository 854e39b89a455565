use clap::{ArgGroup, Args, Subcommand};

#[derive(Args, Clone, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub cmd: CacheSub,
}

#[derive(Subcommand, Clone, Debug)]
pub enum CacheSub {
    /// Entry counts and size on disk
    Stats,
    /// Remove every cached result
    Clear,
    /// Remove the entries of one model or one task
    Invalidate(InvalidateArgs),
}

#[derive(Args, Clone, Debug)]
#[command(group(ArgGroup::new("scope").required(true).args(["model", "task"])))]
pub struct InvalidateArgs {
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub task: Option<String>,
}
