use serde_json::json;
use sha2::{Digest, Sha256};

use crate::model::{ModelConfig, Task};

/// Embedded in every cache key; bump when evaluation semantics change.
pub const CACHE_VERSION: &str = "v2.0";

const SHORT_DIGEST_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// Truncated SHA-256 of `canonical`.
    pub hex: String,
    pub canonical: String,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

fn short_digest(bytes: &[u8]) -> String {
    let mut hex = sha256_hex(bytes);
    hex.truncate(SHORT_DIGEST_LEN);
    hex
}

/// RFC 8785 canonical form: object keys sorted, no insignificant whitespace.
pub fn canonical_json(value: &serde_json::Value) -> String {
    serde_jcs::to_string(value).unwrap_or_else(|_| value.to_string())
}

fn fingerprint_of(value: serde_json::Value) -> Fingerprint {
    let canonical = canonical_json(&value);
    Fingerprint {
        hex: short_digest(canonical.as_bytes()),
        canonical,
    }
}

/// Digest of raw image bytes, folded into the task fingerprint.
pub fn image_digest(bytes: &[u8]) -> String {
    short_digest(bytes)
}

/// Fingerprint of every model field that shapes the provider request.
pub fn model_fingerprint(model: &ModelConfig) -> Fingerprint {
    let mut value = json!({
        "id": model.id,
        "provider": model.provider.as_str(),
        "endpoint": model.endpoint,
        "model": model.model,
        "region": model.region,
    });
    if let Some(base_url) = &model.base_url {
        value["base_url"] = json!(base_url);
    }
    fingerprint_of(value)
}

/// Fingerprint of task content, plus the image digest when the image exists.
pub fn task_fingerprint(task: &Task, image_digest: Option<&str>) -> Fingerprint {
    let mut value = json!({
        "id": task.id,
        "context": task.context,
        "questions": task.questions,
        "type": task.task_type,
    });
    if let Some(digest) = image_digest {
        value["image_hash"] = json!(digest);
    }
    fingerprint_of(value)
}

/// `version_modelid_modelhash_taskid_taskhash`
pub fn cache_key(
    version: &str,
    model: &ModelConfig,
    model_fp: &Fingerprint,
    task: &Task,
    task_fp: &Fingerprint,
) -> String {
    format!(
        "{}_{}_{}_{}_{}",
        version, model.id, model_fp.hex, task.id, task_fp.hex
    )
}
