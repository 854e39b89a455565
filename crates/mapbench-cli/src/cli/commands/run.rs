use std::path::Path;
use std::time::Duration;

use mapbench_core::judge::DEFAULT_JUDGE_MODEL;
use mapbench_core::{
    load_tasks, render_cache_stats, render_leaderboard, BenchPaths, Evaluator, Judge,
    JudgeSettings, ModelRegistry, ResultCache, ResultStore, RunSettings, Scorer, TaskSelection,
};

use crate::cli::args::RunArgs;
use crate::exit_codes::SUCCESS;

fn paths_for(data_dir: &Path, args: &RunArgs) -> BenchPaths {
    let mut paths = BenchPaths::under(data_dir);
    if let Some(output) = &args.output {
        paths.results_dir = output.clone();
    }
    paths
}

fn settings_for(args: &RunArgs) -> RunSettings {
    RunSettings {
        use_cache: !args.no_cache,
        force_refresh: args.force_refresh,
        max_concurrency: args.max_concurrency,
        dispatch_timeout: args.timeout_secs.map(Duration::from_secs),
        ..RunSettings::default()
    }
}

/// A judge when one is wanted and its credential resolves; otherwise
/// free-form answers fall back to word overlap.
fn build_scorer(args: &RunArgs, http: reqwest::Client) -> Scorer {
    let settings = JudgeSettings {
        enabled: !args.no_judge,
        model: args
            .judge_model
            .clone()
            .unwrap_or_else(|| DEFAULT_JUDGE_MODEL.to_string()),
        ..JudgeSettings::default()
    };
    match Judge::from_settings(&settings, http) {
        Ok(judge) => Scorer::new(judge),
        Err(e) => {
            tracing::warn!(error = %e, "judge unavailable; using similarity scoring");
            Scorer::new(None)
        }
    }
}

pub(crate) async fn run(data_dir: &Path, args: RunArgs) -> anyhow::Result<i32> {
    let paths = paths_for(data_dir, &args);
    let settings = settings_for(&args);

    if args.cache_stats {
        let cache = ResultCache::open(&paths.cache_dir, &paths.tasks_dir).await?;
        print!("{}", render_cache_stats(&cache.stats().await));
        return Ok(SUCCESS);
    }

    let http = reqwest::Client::new();
    let registry = ModelRegistry::load(&paths.models_file, http.clone())?;
    let tasks = load_tasks(
        &paths.tasks_dir,
        &TaskSelection {
            ids: args.tasks.clone(),
            limit: args.limit,
            seed: args.seed,
        },
    )?;

    let cache = if settings.use_cache {
        Some(ResultCache::open(&paths.cache_dir, &paths.tasks_dir).await?)
    } else {
        None
    };
    let scorer = build_scorer(&args, http);

    let evaluator = Evaluator::new(
        registry,
        cache,
        ResultStore::new(&paths.results_dir),
        scorer,
        settings,
        &paths.tasks_dir,
    );
    let run = evaluator.evaluate_all(args.models.as_deref(), &tasks).await?;

    print!("{}", render_leaderboard(&run.leaderboard));
    tracing::info!(results_dir = %paths.results_dir.display(), "results saved");
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: RunArgs,
    }

    fn parse(argv: &[&str]) -> RunArgs {
        let mut full = vec!["run"];
        full.extend_from_slice(argv);
        Wrapper::try_parse_from(full).unwrap().args
    }

    #[test]
    fn flags_map_onto_run_settings() {
        let settings = settings_for(&parse(&[
            "--no-cache",
            "--max-concurrency",
            "8",
            "--timeout-secs",
            "30",
        ]));
        assert!(!settings.use_cache);
        assert!(!settings.force_refresh);
        assert_eq!(settings.max_concurrency, 8);
        assert_eq!(settings.dispatch_timeout, Some(Duration::from_secs(30)));

        let settings = settings_for(&parse(&["--force-refresh"]));
        assert!(settings.use_cache);
        assert!(settings.force_refresh);
        assert_eq!(settings.dispatch_timeout, None);
    }

    #[test]
    fn output_overrides_results_dir_only() {
        let paths = paths_for(Path::new("bench"), &parse(&["--output", "out"]));
        assert_eq!(paths.results_dir, Path::new("out"));
        assert_eq!(paths.tasks_dir, Path::new("bench/tasks"));
        assert_eq!(paths.models_file, Path::new("bench/models.yaml"));
    }

    #[test]
    fn disabled_judge_falls_back_to_similarity() {
        let scorer = build_scorer(&parse(&["--no-judge"]), reqwest::Client::new());
        assert!(!scorer.has_judge());
    }
}
