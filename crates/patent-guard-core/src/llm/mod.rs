mod settings;

pub mod openai;
pub mod rig_adapter;

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use openai::OpenAiClient;
pub use rig_adapter::RigCompletionClient;
pub use settings::{LlmOverrides, LlmSettings};

/// A single-shot prompt/response exchange with a text model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature,
        }
    }
}

/// Per-call failures reported by a completion service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transient(String),
    #[error("completion request timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),
    #[error("completion response contained no text")]
    EmptyResponse,
    #[error("completion response was malformed: {0}")]
    Malformed(String),
    #[error("completion client misconfigured: {0}")]
    Config(String),
}

impl CompletionError {
    /// Network and timeout failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }
}

/// Client abstraction over the external text-generation service.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Short provider label used in logs and health output.
    fn provider(&self) -> &str;

    /// Send one prompt and return the generated text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

#[async_trait]
impl<T: CompletionClient + ?Sized> CompletionClient for Arc<T> {
    fn provider(&self) -> &str {
        (**self).provider()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        (**self).complete(request).await
    }
}

pub const NOOP_RESPONSE: &str = "Completion provider not configured; no model output available.";

/// Offline client returning a fixed sentence for every prompt.
#[derive(Debug, Default, Clone)]
pub struct NoopCompletionClient;

#[async_trait]
impl CompletionClient for NoopCompletionClient {
    fn provider(&self) -> &str {
        "noop"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        Ok(NOOP_RESPONSE.to_string())
    }
}

/// Supported completion backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Azure,
    RigOpenAi,
    Noop,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "azure" => Ok(Self::Azure),
            "rig-openai" => Ok(Self::RigOpenAi),
            "noop" => Ok(Self::Noop),
            other => bail!(
                "unsupported provider `{other}` (expected openai, anthropic, azure, rig-openai or noop)"
            ),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Azure => "azure",
            Self::RigOpenAi => "rig-openai",
            Self::Noop => "noop",
        };
        f.write_str(label)
    }
}

/// Construct the completion client selected by `settings.provider`.
pub fn build_client(settings: &LlmSettings) -> Result<Arc<dyn CompletionClient>> {
    let kind: ProviderKind = settings.provider.parse()?;
    tracing::debug!(provider = %kind, model = ?settings.model, "building completion client");
    match kind {
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiClient::new(settings)?)),
        ProviderKind::Noop => Ok(Arc::new(NoopCompletionClient)),
        ProviderKind::Anthropic | ProviderKind::Azure | ProviderKind::RigOpenAi => {
            Ok(Arc::from(RigCompletionClient::for_kind(kind, settings)?))
        }
    }
}

/// Trim model output and unwrap a single surrounding markdown code fence.
pub fn normalize_response(raw: &str) -> String {
    let trimmed = raw.trim();
    strip_code_fence(trimmed).unwrap_or_else(|| trimmed.to_string())
}

fn strip_code_fence(input: &str) -> Option<String> {
    let mut trimmed = input.trim();
    if !trimmed.starts_with("```") {
        return None;
    }
    trimmed = trimmed.trim_start_matches("```");
    // Language tag on the opening fence line, e.g. ```text
    if let Some(newline) = trimmed.find('\n') {
        let tag = &trimmed[..newline];
        if !tag.trim().contains(char::is_whitespace) {
            trimmed = &trimmed[newline + 1..];
        }
    }
    let end = trimmed.rfind("```").unwrap_or(trimmed.len());
    Some(trimmed[..end].trim().to_string())
}

pub(crate) fn debug_enabled() -> bool {
    matches!(std::env::var("PATENT_GUARD_DEBUG"), Ok(val) if !val.is_empty() && val != "0")
}
