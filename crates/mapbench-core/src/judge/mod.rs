//! LLM-as-judge grading for free-form answers.

mod client;
mod prompt;

use std::sync::Arc;

use tracing::Instrument;

use crate::errors::AuthError;
use crate::providers::credentials::resolve_reference;
use crate::providers::{LlmClient, OpenAIClient};

pub const DEFAULT_JUDGE_MODEL: &str = "gpt-4o";
pub const DEFAULT_JUDGE_AUTH: &str = "env:OPENAI_API_KEY";

/// A judge's grade of one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeVerdict {
    /// In `[0, 1]`.
    pub score: f64,
    pub explanation: String,
}

#[derive(Debug, Clone)]
pub struct JudgeSettings {
    pub enabled: bool,
    pub model: String,
    /// Credential reference, `env:<VARIABLE>`.
    pub auth: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: DEFAULT_JUDGE_MODEL.to_string(),
            auth: DEFAULT_JUDGE_AUTH.to_string(),
            base_url: None,
            temperature: 0.0,
            max_tokens: 200,
        }
    }
}

#[derive(Clone)]
pub struct Judge {
    client: Arc<dyn LlmClient>,
}

impl Judge {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Build an OpenAI-backed judge.
    ///
    /// `Ok(None)` when judging is disabled; `Err` when the credential cannot
    /// be resolved.
    pub fn from_settings(
        settings: &JudgeSettings,
        http: reqwest::Client,
    ) -> Result<Option<Self>, AuthError> {
        if !settings.enabled {
            return Ok(None);
        }
        let api_key = resolve_reference("judge", Some(&settings.auth))?;
        let mut client = OpenAIClient::new(
            settings.model.clone(),
            api_key,
            settings.temperature,
            settings.max_tokens,
        )
        .with_json_mode()
        .with_client(http);
        if let Some(base_url) = &settings.base_url {
            client = client.with_base_url(base_url.clone());
        }
        Ok(Some(Self::new(Arc::new(client))))
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    pub async fn grade(
        &self,
        question: &str,
        expected: &str,
        produced: &str,
    ) -> anyhow::Result<JudgeVerdict> {
        let prompt = prompt::build_prompt_impl(question, expected, produced);
        let span = tracing::debug_span!("mapbench.judge", provider = self.provider_name());
        client::call_judge_impl(self, &prompt).instrument(span).await
    }
}
