//! Answer grading and per-model aggregation.
//!
//! `exact_match` questions are graded by rule. Everything else goes to the
//! judge when one is configured, or to word-overlap similarity when not.
//! Grading never fails: judge problems become a 0.0 score whose explanation
//! names the failure.

use std::collections::{BTreeMap, HashSet};

use tracing::warn;

use crate::judge::Judge;
use crate::model::{AggregateScore, EvaluationResult, ScoringMethod, ScoringResult, EXACT_MATCH};

pub fn rule_based(expected: &str, produced: &str) -> (f64, String) {
    if expected.trim().to_lowercase() == produced.trim().to_lowercase() {
        (1.0, "Exact match".to_string())
    } else {
        (
            0.0,
            format!(
                "No match: expected '{}', got '{}'",
                expected.trim(),
                produced.trim()
            ),
        )
    }
}

/// `|expected ∩ produced| / |expected|` over lowercase whitespace-separated words.
pub fn similarity(expected: &str, produced: &str) -> (f64, String) {
    let expected_lower = expected.to_lowercase();
    let produced_lower = produced.to_lowercase();
    let expected_words: HashSet<&str> = expected_lower.split_whitespace().collect();
    if expected_words.is_empty() {
        return (0.0, "No expected answer provided".to_string());
    }
    let produced_words: HashSet<&str> = produced_lower.split_whitespace().collect();
    let overlap = expected_words.intersection(&produced_words).count();
    (
        overlap as f64 / expected_words.len() as f64,
        format!(
            "Word overlap: {}/{} words matched",
            overlap,
            expected_words.len()
        ),
    )
}

#[derive(Clone, Default)]
pub struct Scorer {
    judge: Option<Judge>,
}

impl Scorer {
    pub fn new(judge: Option<Judge>) -> Self {
        Self { judge }
    }

    pub fn has_judge(&self) -> bool {
        self.judge.is_some()
    }

    /// Grade one answer. Task and model ids are left empty; see
    /// [`Scorer::score_evaluation_result`].
    pub async fn score_answer(
        &self,
        question: &str,
        expected: &str,
        produced: &str,
        answer_type: &str,
    ) -> ScoringResult {
        let (score, explanation, scoring_method) = if answer_type == EXACT_MATCH {
            let (score, explanation) = rule_based(expected, produced);
            (score, explanation, ScoringMethod::RuleBased)
        } else if let Some(judge) = &self.judge {
            match judge.grade(question, expected, produced).await {
                Ok(verdict) => (verdict.score, verdict.explanation, ScoringMethod::Judge),
                Err(e) => {
                    warn!(error = %e, "judge scoring failed");
                    (0.0, format!("Error in judge scoring: {}", e), ScoringMethod::Judge)
                }
            }
        } else {
            let (score, explanation) = similarity(expected, produced);
            (score, explanation, ScoringMethod::Similarity)
        };

        ScoringResult {
            task_id: String::new(),
            model_id: String::new(),
            question: question.to_string(),
            expected_answer: expected.to_string(),
            model_answer: produced.to_string(),
            score,
            explanation,
            scoring_method,
        }
    }

    /// Grade every answer in order. Failed results have no answers and
    /// therefore no scores.
    pub async fn score_evaluation_result(&self, result: &EvaluationResult) -> Vec<ScoringResult> {
        let mut scores = Vec::with_capacity(result.answers.len());
        for answer in &result.answers {
            let mut scored = self
                .score_answer(
                    &answer.question,
                    &answer.expected,
                    &answer.model_answer,
                    &answer.answer_type,
                )
                .await;
            scored.task_id = result.task_id.clone();
            scored.model_id = result.model_id.clone();
            scores.push(scored);
        }
        scores
    }
}

/// Flat mean over every score, plus per-task means. Empty input yields zeros.
pub fn calculate_aggregate_score(scores: &[ScoringResult]) -> AggregateScore {
    if scores.is_empty() {
        return AggregateScore::default();
    }

    let mut per_task: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for s in scores {
        let slot = per_task.entry(s.task_id.clone()).or_insert((0.0, 0));
        slot.0 += s.score;
        slot.1 += 1;
    }

    AggregateScore {
        overall: scores.iter().map(|s| s.score).sum::<f64>() / scores.len() as f64,
        by_task: per_task
            .into_iter()
            .map(|(task, (sum, n))| (task, sum / n as f64))
            .collect(),
        total_questions: scores.len(),
    }
}
