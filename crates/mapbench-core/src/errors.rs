//! Error taxonomy.
//!
//! Caller mistakes (`ConfigError`) are raised synchronously. Environmental
//! failures (`AuthError`, `ProviderError`) are captured into
//! `EvaluationResult::error` by the engine and never escape a run. Cache
//! corruption is not an error type at all: the read path treats it as a miss.

use std::path::PathBuf;
use std::time::Duration;

/// Caller configuration mistakes.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Model id not present in the registry.
    #[error("model {model_id} not found in registry")]
    UnknownModel { model_id: String },

    /// Registry or task file missing.
    #[error("config file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// Registry or task file present but unreadable or malformed.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Two entries share an id.
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    /// Anything else the caller got wrong.
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// Credential resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("API key not found for {model_id}: no auth reference configured")]
    MissingReference { model_id: String },

    #[error("unsupported auth reference '{reference}' for {model_id} (expected env:<VARIABLE>)")]
    UnsupportedReference { model_id: String, reference: String },

    #[error("API key not found for {model_id}: environment variable {variable} is not set")]
    MissingVariable { model_id: String, variable: String },
}

/// Provider dispatch failures.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// No adapter exists for this provider tag.
    #[error("provider {provider} not implemented")]
    NotImplemented { provider: String },

    /// Adapter exists but lacks required settings (project id, ...).
    #[error("{provider} is not configured: {message}")]
    Unconfigured {
        provider: &'static str,
        message: String,
    },

    /// The map image could not be read.
    #[error("failed to read map image {}: {message}", path.display())]
    Image { path: PathBuf, message: String },

    /// Connection, TLS or body-read failure.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Non-success HTTP status.
    #[error("{provider} API error (status {status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// Success status but a payload we cannot read.
    #[error("invalid {provider} response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("dispatch timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

/// Failures on the cache write path.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error: {message}")]
    Io { message: String },

    #[error("cache serialization error: {message}")]
    Serialize { message: String },
}

/// Failures persisting durable results.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("result store I/O error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("result store serialization error: {message}")]
    Serialize { message: String },
}

/// Top-level error for a benchmark run.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("evaluation task failed: {message}")]
    Join { message: String },
}

impl EvalError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 1,
            Self::Store(_) | Self::Cache(_) | Self::Join { .. } => 2,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type ProviderResult<T> = Result<T, ProviderError>;
pub type CacheResult<T> = Result<T, CacheError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type EvalResult<T> = Result<T, EvalError>;
