//! Vertex AI `generateContent` adapter for Gemini models.
//!
//! The bearer token comes from the model's `auth` reference (typically
//! `env:VERTEX_ACCESS_TOKEN`, e.g. the output of `gcloud auth print-access-token`).
//! The project id is read from `VERTEX_PROJECT_ID` or `GOOGLE_CLOUD_PROJECT`
//! unless `base_url` points somewhere else entirely.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::credentials::resolve_reference;
use super::{BatchRequest, ProviderAdapter, ProviderReply, TokenUsage};
use crate::errors::{ProviderError, ProviderResult};
use crate::model::ModelConfig;

pub const DEFAULT_REGION: &str = "us-central1";
const PROJECT_ENV_VARS: &[&str] = &["VERTEX_PROJECT_ID", "GOOGLE_CLOUD_PROJECT"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct VertexAdapter {
    client: reqwest::Client,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl VertexAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            temperature: 0.0,
            max_output_tokens: 1500,
        }
    }

    fn endpoint(model: &ModelConfig) -> ProviderResult<String> {
        let base = match model.base_url.as_deref() {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => {
                let project = PROJECT_ENV_VARS
                    .iter()
                    .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
                    .ok_or_else(|| ProviderError::Unconfigured {
                        provider: "vertexai",
                        message: format!("set one of {}", PROJECT_ENV_VARS.join(", ")),
                    })?;
                let region = model.region.as_deref().unwrap_or(DEFAULT_REGION);
                format!(
                    "https://{region}-aiplatform.googleapis.com/v1/projects/{project}/locations/{region}/publishers/google/models"
                )
            }
        };
        Ok(format!("{}/{}:generateContent", base, model.model_name()))
    }

    fn body<'a>(&self, request: &'a BatchRequest) -> GenerateRequest<'a> {
        let mut parts = Vec::new();
        if let Some(context) = &request.context {
            parts.push(Part::Text { text: context });
        }
        parts.push(Part::Inline {
            inline_data: InlineData {
                mime_type: request.image.mime,
                data: request.image.base64(),
            },
        });
        parts.push(Part::Text {
            text: &request.prompt,
        });

        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text {
                    text: request.system,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl ProviderAdapter for VertexAdapter {
    fn provider_name(&self) -> &'static str {
        "vertexai"
    }

    async fn complete(
        &self,
        model: &ModelConfig,
        request: &BatchRequest,
    ) -> ProviderResult<ProviderReply> {
        let token = resolve_reference(&model.id, model.auth.as_deref())?;
        let url = Self::endpoint(model)?;

        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&self.body(request))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: "vertexai",
                status: status.as_u16(),
                body: error_text,
            });
        }

        let parsed: GenerateResponse =
            resp.json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    provider: "vertexai",
                    message: e.to_string(),
                })?;

        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "vertexai",
                message: "response has no candidates".to_string(),
            })?;

        let text = content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        let usage = parsed.usage_metadata.and_then(|u| {
            Some(TokenUsage {
                input_tokens: u.prompt_token_count?,
                output_tokens: u.candidates_token_count?,
            })
        });

        Ok(ProviderReply { text, usage })
    }
}
