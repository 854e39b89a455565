//! Batched prompt construction.
//!
//! Every question of a task goes into one request, numbered from 1, and the
//! model is told to answer in the same numbered form so the reply can be
//! split back into per-question answers.

use std::path::Path;

use base64::Engine;

use crate::errors::{ProviderError, ProviderResult};
use crate::model::Task;

pub const SYSTEM_INSTRUCTION: &str = "You are a map interpretation assistant. \
     Answer questions about the provided map image accurately and concisely.";

/// Encoded map image attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapImage {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl MapImage {
    pub fn base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64())
    }
}

/// Provider-agnostic request: what every adapter has to send.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub system: &'static str,
    /// Already rendered as `Context: ...`.
    pub context: Option<String>,
    pub image: MapImage,
    pub prompt: String,
    pub question_count: usize,
}

pub fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

pub async fn load_image(image_root: &Path, task: &Task) -> ProviderResult<MapImage> {
    let path = task.image_path(image_root);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ProviderError::Image {
            path: path.clone(),
            message: e.to_string(),
        })?;
    Ok(MapImage {
        mime: mime_for(&path),
        bytes,
    })
}

pub fn batched_prompt(task: &Task) -> String {
    let mut prompt = String::from(
        "Answer each of the following questions about the map. \
         Reply with one answer per question, numbered exactly as the questions are \
         (1., 2., ...), and nothing else.\n\n",
    );
    for (i, question) in task.questions.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, question.text.trim()));
    }
    prompt
}

pub fn build_request(task: &Task, image: MapImage) -> BatchRequest {
    BatchRequest {
        system: SYSTEM_INSTRUCTION,
        context: task
            .context
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(|c| format!("Context: {}", c)),
        image,
        prompt: batched_prompt(task),
        question_count: task.questions.len(),
    }
}
