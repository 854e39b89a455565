//! Provider adapters: one batched request per task, parsed back into answers.
//!
//! An adapter is chosen once per model when the registry loads
//! ([`adapter_for`]) and called polymorphically afterwards.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::errors::{ProviderError, ProviderResult};
use crate::model::{Answer, EvaluationResult, ModelConfig, Provider, Task};

pub mod credentials;
pub mod llm;
pub mod openai;
pub mod parse;
pub mod pricing;
pub mod prompt;
pub mod vertex;

pub use llm::{LlmClient, LlmResponse, OpenAIClient};
pub use openai::OpenAiAdapter;
pub use prompt::{BatchRequest, MapImage};
pub use vertex::VertexAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Raw provider reply before parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Fails fast for adapters that cannot serve any request.
    fn ensure_supported(&self) -> ProviderResult<()> {
        Ok(())
    }

    async fn complete(
        &self,
        model: &ModelConfig,
        request: &BatchRequest,
    ) -> ProviderResult<ProviderReply>;
}

/// Stand-in for provider tags with no implementation.
#[derive(Debug, Clone)]
pub struct UnsupportedAdapter {
    tag: String,
}

#[async_trait]
impl ProviderAdapter for UnsupportedAdapter {
    fn provider_name(&self) -> &'static str {
        "unsupported"
    }

    fn ensure_supported(&self) -> ProviderResult<()> {
        Err(ProviderError::NotImplemented {
            provider: self.tag.clone(),
        })
    }

    async fn complete(
        &self,
        _model: &ModelConfig,
        _request: &BatchRequest,
    ) -> ProviderResult<ProviderReply> {
        Err(ProviderError::NotImplemented {
            provider: self.tag.clone(),
        })
    }
}

pub fn adapter_for(provider: &Provider, client: reqwest::Client) -> Arc<dyn ProviderAdapter> {
    match provider {
        Provider::OpenAi => Arc::new(OpenAiAdapter::new(client)),
        Provider::VertexAi => Arc::new(VertexAdapter::new(client)),
        Provider::Unsupported(tag) => Arc::new(UnsupportedAdapter { tag: tag.clone() }),
    }
}

/// Run one task against one model through `adapter`.
///
/// The returned result has no execution time; the caller owns timing.
pub async fn run_task(
    adapter: &dyn ProviderAdapter,
    model: &ModelConfig,
    task: &Task,
    image_root: &Path,
) -> ProviderResult<EvaluationResult> {
    adapter.ensure_supported()?;

    let image = prompt::load_image(image_root, task).await?;
    let request = prompt::build_request(task, image);
    let reply = adapter.complete(model, &request).await?;

    let parsed = parse::parse_answers(&reply.text, task.questions.len());
    let answers = task
        .questions
        .iter()
        .zip(parsed)
        .map(|(question, model_answer)| Answer {
            question: question.text.clone(),
            expected: question.expected.clone(),
            model_answer,
            answer_type: question.answer_type.clone(),
        })
        .collect();

    let (input_tokens, output_tokens, estimated_cost) = match reply.usage {
        Some(usage) => (
            Some(usage.input_tokens),
            Some(usage.output_tokens),
            Some(pricing::estimate_cost(
                model.model_name(),
                usage.input_tokens,
                usage.output_tokens,
            )),
        ),
        None => (None, None, None),
    };

    Ok(EvaluationResult {
        model_id: model.id.clone(),
        task_id: task.id.clone(),
        timestamp: Utc::now(),
        answers,
        raw_response: Some(reply.text),
        error: None,
        execution_time: None,
        estimated_cost,
        input_tokens,
        output_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Question;
    use tempfile::TempDir;

    struct CannedAdapter(&'static str);

    #[async_trait]
    impl ProviderAdapter for CannedAdapter {
        fn provider_name(&self) -> &'static str {
            "canned"
        }

        async fn complete(
            &self,
            _model: &ModelConfig,
            request: &BatchRequest,
        ) -> ProviderResult<ProviderReply> {
            assert!(request.prompt.contains("1. Capital?"));
            Ok(ProviderReply {
                text: self.0.to_string(),
                usage: Some(TokenUsage {
                    input_tokens: 1_000_000,
                    output_tokens: 0,
                }),
            })
        }
    }

    fn model(provider: Provider) -> ModelConfig {
        ModelConfig {
            id: "gpt-4o".into(),
            provider,
            endpoint: Some("openai:gpt-4o".into()),
            model: None,
            region: None,
            auth: None,
            description: None,
            base_url: None,
        }
    }

    fn task() -> Task {
        Task {
            id: "t1".into(),
            map_image: "map.png".into(),
            context: None,
            questions: vec![
                Question {
                    text: "Capital?".into(),
                    expected: "Paris".into(),
                    answer_type: "exact_match".into(),
                },
                Question {
                    text: "River?".into(),
                    expected: "Seine".into(),
                    answer_type: "short_answer".into(),
                },
            ],
            task_type: None,
        }
    }

    #[tokio::test]
    async fn answers_align_with_questions_and_cost_is_priced() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("map.png"), b"png").unwrap();

        let result = run_task(
            &CannedAdapter("1. Paris\n2. Seine"),
            &model(Provider::OpenAi),
            &task(),
            tmp.path(),
        )
        .await
        .unwrap();

        assert_eq!(result.answers.len(), 2);
        assert_eq!(result.answers[0].model_answer, "Paris");
        assert_eq!(result.answers[1].expected, "Seine");
        assert_eq!(result.answers[1].answer_type, "short_answer");
        assert_eq!(result.input_tokens, Some(1_000_000));
        assert_eq!(result.estimated_cost, Some(2.5));
        assert_eq!(result.raw_response.as_deref(), Some("1. Paris\n2. Seine"));
        assert!(result.execution_time.is_none());
    }

    #[tokio::test]
    async fn missing_image_is_a_provider_error() {
        let tmp = TempDir::new().unwrap();
        let err = run_task(
            &CannedAdapter("1. Paris"),
            &model(Provider::OpenAi),
            &task(),
            tmp.path(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::Image { .. }));
    }

    #[tokio::test]
    async fn unknown_provider_reports_not_implemented() {
        let provider = Provider::Unsupported("bedrock".into());
        let adapter = adapter_for(&provider, reqwest::Client::new());
        let tmp = TempDir::new().unwrap();

        let err = run_task(adapter.as_ref(), &model(provider), &task(), tmp.path())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "provider bedrock not implemented");
    }
}
