use crate::model::{LeaderboardEntry, ModelEvaluation};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent(fraction: f64) -> f64 {
    round2(fraction * 100.0)
}

fn entry_for(eval: &ModelEvaluation) -> LeaderboardEntry {
    let succeeded: Vec<_> = eval
        .detailed_results
        .iter()
        .filter(|r| !r.is_error())
        .collect();

    let times: Vec<f64> = succeeded.iter().filter_map(|r| r.execution_time).collect();
    let avg_execution_time = if times.is_empty() {
        None
    } else {
        Some(times.iter().sum::<f64>() / times.len() as f64)
    };

    LeaderboardEntry {
        rank: 0,
        model_id: eval.model_id.clone(),
        overall_score: percent(eval.aggregate_scores.overall),
        total_questions: eval.aggregate_scores.total_questions,
        avg_execution_time,
        total_cost: succeeded.iter().filter_map(|r| r.estimated_cost).sum(),
        total_input_tokens: succeeded.iter().filter_map(|r| r.input_tokens).sum(),
        total_output_tokens: succeeded.iter().filter_map(|r| r.output_tokens).sum(),
        last_updated: eval.timestamp,
        task_scores: eval
            .aggregate_scores
            .by_task
            .iter()
            .map(|(task, score)| {
                (
                    format!("{}{}", LeaderboardEntry::TASK_COLUMN_PREFIX, task),
                    percent(*score),
                )
            })
            .collect(),
    }
}

/// One row per model, sorted by overall score descending, ranked 1..N.
///
/// The sort is stable, so exact ties keep their input order.
pub fn build_leaderboard(evaluations: &[ModelEvaluation]) -> Vec<LeaderboardEntry> {
    let mut rows: Vec<LeaderboardEntry> = evaluations.iter().map(entry_for).collect();
    rows.sort_by(|a, b| b.overall_score.total_cmp(&a.overall_score));
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    rows
}
