use super::{debug_enabled, CompletionClient, CompletionError, CompletionRequest, LlmSettings};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const SYSTEM_PROMPT: &str = "You are a patent analyst assisting with infringement screening. Follow the requested output format exactly and do not add commentary.";

/// Chat-completions client. `timeout_secs` bounds each attempt; see
/// [`LlmSettings::fit_to_call_budget`] for sizing it against the call timeout.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    url: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl OpenAiClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            bail!("OpenAI API key must be provided via PATENT_GUARD_API_KEY");
        }
        let base = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());
        let url = format!("{}/v1/chat/completions", base.trim_end_matches('/'));
        let http = Client::builder()
            .user_agent("patent-guard/0.3")
            .timeout(Duration::from_secs(settings.timeout_secs.unwrap_or(30)))
            .build()
            .context("failed to build OpenAI HTTP client")?;
        Ok(Self {
            http,
            url,
            api_key: settings.api_key.clone(),
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_retries: settings.max_retries,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn provider(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut attempt = 0u32;
        let mut backoff = Duration::from_millis(200);
        loop {
            let response = self
                .http
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&payload)
                .send()
                .await;

            let response = match response {
                Ok(resp) => resp,
                Err(err) => {
                    if attempt >= self.max_retries {
                        return Err(CompletionError::Transient(format!(
                            "failed to call OpenAI chat completions API: {err}"
                        )));
                    }
                    tracing::debug!(attempt, error = %err, "openai transport error; retrying");
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(Duration::from_secs(5));
                    attempt += 1;
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                if is_retryable_status(status) && attempt < self.max_retries {
                    tracing::debug!(attempt, %status, "openai returned retryable status");
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(Duration::from_secs(5));
                    attempt += 1;
                    continue;
                }
                let body = response.text().await.unwrap_or_default();
                if debug_enabled() {
                    tracing::warn!("openai error body: {}", body);
                }
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    return Err(CompletionError::Config(format!(
                        "OpenAI rejected the credentials ({status})"
                    )));
                }
                return Err(CompletionError::Transient(format!(
                    "OpenAI API error ({status})"
                )));
            }

            let chat: ChatCompletionResponse = response.json().await.map_err(|err| {
                CompletionError::Malformed(format!("failed to parse OpenAI response: {err}"))
            })?;
            let content = chat
                .choices
                .into_iter()
                .find_map(|choice| choice.message.content)
                .filter(|text| !text.trim().is_empty())
                .ok_or(CompletionError::EmptyResponse)?;
            if debug_enabled() {
                tracing::warn!("openai raw completion: {}", content);
            }
            return Ok(content);
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
