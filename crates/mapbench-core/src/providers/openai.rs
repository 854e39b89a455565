use async_trait::async_trait;
use serde_json::{json, Value};

use super::credentials::resolve_reference;
use super::{BatchRequest, ProviderAdapter, ProviderReply, TokenUsage};
use crate::errors::{ProviderError, ProviderResult};
use crate::model::ModelConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-style chat completions with the map attached as a data URI.
#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    client: reqwest::Client,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl OpenAiAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            temperature: 0.0,
            max_tokens: 1500,
        }
    }

    fn messages(request: &BatchRequest) -> Vec<Value> {
        let mut messages = vec![json!({"role": "system", "content": request.system})];
        if let Some(context) = &request.context {
            messages.push(json!({"role": "user", "content": context}));
        }
        messages.push(json!({
            "role": "user",
            "content": [
                {"type": "image_url", "image_url": {"url": request.image.data_uri()}}
            ]
        }));
        messages.push(json!({"role": "user", "content": request.prompt}));
        messages
    }
}

pub(crate) fn usage_from(json: &Value) -> Option<TokenUsage> {
    let usage = json.get("usage")?;
    Some(TokenUsage {
        input_tokens: usage.get("prompt_tokens")?.as_u64()?,
        output_tokens: usage.get("completion_tokens")?.as_u64()?,
    })
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    async fn complete(
        &self,
        model: &ModelConfig,
        request: &BatchRequest,
    ) -> ProviderResult<ProviderReply> {
        let api_key = resolve_reference(&model.id, model.auth.as_deref())?;
        let base = model.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{}/chat/completions", base.trim_end_matches('/'));

        let body = json!({
            "model": model.model_name(),
            "messages": Self::messages(request),
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: "openai",
                status: status.as_u16(),
                body: error_text,
            });
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse {
                provider: "openai",
                message: e.to_string(),
            })?;

        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "openai",
                message: "response missing choices[0].message.content".to_string(),
            })?
            .to_string();

        Ok(ProviderReply {
            text,
            usage: usage_from(&json),
        })
    }
}
