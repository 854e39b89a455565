use std::path::Path;

use mapbench_core::{render_cache_stats, BenchPaths, ResultCache};

use crate::cli::args::{CacheArgs, CacheSub};
use crate::exit_codes::SUCCESS;

pub(crate) async fn run(data_dir: &Path, args: CacheArgs) -> anyhow::Result<i32> {
    let paths = BenchPaths::under(data_dir);
    let cache = ResultCache::open(&paths.cache_dir, &paths.tasks_dir).await?;

    match args.cmd {
        CacheSub::Stats => print!("{}", render_cache_stats(&cache.stats().await)),
        CacheSub::Clear => {
            let before = cache.stats().await.entry_count;
            cache.clear().await?;
            println!("Cleared {} cache entries", before);
        }
        CacheSub::Invalidate(scope) => {
            let (removed, label) = match (scope.model, scope.task) {
                (Some(model), _) => (
                    cache.invalidate_by_model(&model).await?,
                    format!("model {model}"),
                ),
                (None, Some(task)) => (
                    cache.invalidate_by_task(&task).await?,
                    format!("task {task}"),
                ),
                (None, None) => anyhow::bail!("invalidate needs --model or --task"),
            };
            println!("Invalidated {} cache entries for {}", removed, label);
        }
    }
    Ok(SUCCESS)
}
