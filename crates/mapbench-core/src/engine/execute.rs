use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, info_span, warn, Instrument};

use super::runner::{Evaluator, PairOutcome, ResultSource};
use crate::errors::{ConfigResult, EvalError, EvalResult, ProviderError, ProviderResult};
use crate::model::{BenchmarkRun, EvaluationResult, ModelEvaluation, RunMetadata, Task};
use crate::providers;
use crate::report::build_leaderboard;
use crate::scoring::calculate_aggregate_score;

pub(crate) async fn run_pair_impl(
    evaluator: &Evaluator,
    model_id: &str,
    task: &Task,
) -> ConfigResult<PairOutcome> {
    let registered = evaluator.registry.get(model_id)?;
    let model = &registered.config;

    if !evaluator.settings.force_refresh {
        if let Some(cache) = &evaluator.cache {
            if let Some(mut hit) = cache.get(model, task).await {
                hit.execution_time = None;
                return Ok(PairOutcome {
                    result: hit,
                    source: ResultSource::Cache,
                });
            }
        }
    }

    let span = info_span!("mapbench.dispatch", model_id = %model.id, task_id = %task.id);
    let (dispatched, elapsed) = dispatch(evaluator, registered.adapter.as_ref(), model, task)
        .instrument(span)
        .await;

    let result = match dispatched {
        Ok(mut result) => {
            result.execution_time = Some(elapsed);
            if let Some(cache) = &evaluator.cache {
                if let Err(e) = cache.put(model, task, &result).await {
                    warn!(model_id = %model.id, task_id = %task.id, error = %e, "failed to cache result");
                }
            }
            result
        }
        Err(e) => {
            warn!(model_id = %model.id, task_id = %task.id, error = %e, "dispatch failed");
            let mut failed = EvaluationResult::failed(&model.id, &task.id, e.to_string());
            failed.execution_time = Some(elapsed);
            failed
        }
    };

    if let Err(e) = evaluator.store.record_result(&result).await {
        warn!(model_id = %model.id, task_id = %task.id, error = %e, "failed to store result");
    }

    Ok(PairOutcome {
        result,
        source: ResultSource::Live,
    })
}

/// The provider call, under a dispatch permit and the optional timeout.
///
/// Returns the outcome and the seconds spent after the permit was granted;
/// time queued for a permit is not counted.
async fn dispatch(
    evaluator: &Evaluator,
    adapter: &dyn providers::ProviderAdapter,
    model: &crate::model::ModelConfig,
    task: &Task,
) -> (ProviderResult<EvaluationResult>, f64) {
    // The semaphore is never closed.
    let _permit = evaluator.dispatch_permits.acquire().await.ok();
    debug!("dispatching");

    let started = Instant::now();
    let call = providers::run_task(adapter, model, task, &evaluator.image_root);
    let outcome = match evaluator.settings.dispatch_timeout {
        Some(limit) => timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(ProviderError::Timeout(limit))),
        None => call.await,
    };
    (outcome, started.elapsed().as_secs_f64())
}

pub(crate) async fn evaluate_model_impl(
    evaluator: &Evaluator,
    model_id: &str,
    tasks: &[Task],
) -> ConfigResult<ModelEvaluation> {
    let mut detailed_results = Vec::with_capacity(tasks.len());
    let mut detailed_scores = Vec::new();
    let (mut cached, mut live, mut failed) = (0usize, 0usize, 0usize);

    for task in tasks {
        let outcome = run_pair_impl(evaluator, model_id, task).await?;
        match outcome.source {
            ResultSource::Cache => cached += 1,
            ResultSource::Live => live += 1,
        }

        if let Some(error) = &outcome.result.error {
            failed += 1;
            warn!(model_id, task_id = %task.id, %error, "task evaluation failed");
        } else {
            let scores = evaluator
                .scorer
                .score_evaluation_result(&outcome.result)
                .await;
            detailed_scores.extend(scores);
        }
        detailed_results.push(outcome.result);
    }

    let aggregate_scores = calculate_aggregate_score(&detailed_scores);
    info!(
        model_id,
        tasks = tasks.len(),
        cached,
        live,
        failed,
        overall = aggregate_scores.overall,
        "model evaluation complete"
    );

    Ok(ModelEvaluation {
        model_id: model_id.to_string(),
        timestamp: Utc::now(),
        aggregate_scores,
        detailed_results,
        detailed_scores,
    })
}

pub(crate) async fn evaluate_all_impl(
    evaluator: &Evaluator,
    model_ids: Option<&[String]>,
    tasks: &[Task],
) -> EvalResult<BenchmarkRun> {
    let model_ids: Vec<String> = match model_ids {
        Some(ids) => ids.to_vec(),
        None => evaluator.registry.ids(),
    };
    for id in &model_ids {
        evaluator.registry.get(id)?;
    }

    info!(
        models = model_ids.len(),
        tasks = tasks.len(),
        max_concurrency = evaluator.settings.max_concurrency,
        "starting evaluation run"
    );

    let tasks: Arc<Vec<Task>> = Arc::new(tasks.to_vec());
    let mut join_set = JoinSet::new();
    for (idx, model_id) in model_ids.iter().enumerate() {
        let this = evaluator.clone();
        let tasks = Arc::clone(&tasks);
        let model_id = model_id.clone();
        join_set.spawn(async move { (idx, this.evaluate_model(&model_id, &tasks).await) });
    }

    let mut evaluations = Vec::with_capacity(model_ids.len());
    while let Some(joined) = join_set.join_next().await {
        let (idx, evaluation) = joined.map_err(|e| EvalError::Join {
            message: e.to_string(),
        })?;
        evaluations.push((idx, evaluation?));
    }
    evaluations.sort_by_key(|(idx, _)| *idx);
    let evaluations: Vec<ModelEvaluation> = evaluations.into_iter().map(|(_, e)| e).collect();

    let run = BenchmarkRun {
        leaderboard: build_leaderboard(&evaluations),
        evaluation_metadata: RunMetadata {
            timestamp: Utc::now(),
            num_models: model_ids.len(),
            num_tasks: tasks.len(),
            task_ids: tasks.iter().map(|t| t.id.clone()).collect(),
            model_ids,
        },
        detailed_results: evaluations,
    };

    evaluator.store.save_run(&run).await?;
    info!(models = run.leaderboard.len(), "evaluation run complete");
    Ok(run)
}
