use super::{
    debug_enabled, CompletionClient, CompletionError, CompletionRequest, LlmSettings, ProviderKind,
};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rig::client::CompletionClient as _;
use rig::completion::message::AssistantContent;
use rig::completion::{CompletionError as RigError, CompletionModelDyn};
use rig::providers::azure::AzureOpenAIAuth;
use rig::providers::{anthropic, azure, openai};
use rig::OneOrMany;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
const PREAMBLE: &str = "You are a patent analyst assisting with infringement screening. Follow the requested output format exactly and do not add commentary.";

/// Completion client backed by a rig-core provider model.
pub struct RigCompletionClient {
    model: Box<dyn CompletionModelDyn + Send + Sync>,
    provider_label: &'static str,
    model_id: String,
}

impl RigCompletionClient {
    pub fn for_kind(
        kind: ProviderKind,
        settings: &LlmSettings,
    ) -> Result<Box<dyn CompletionClient>> {
        match kind {
            ProviderKind::RigOpenAi => Ok(Box::new(Self::new_openai(settings)?)),
            ProviderKind::Anthropic => Ok(Box::new(Self::new_anthropic(settings)?)),
            ProviderKind::Azure => Ok(Box::new(Self::new_azure(settings)?)),
            ProviderKind::OpenAi | ProviderKind::Noop => {
                bail!("rig adapter does not handle provider `{kind}`")
            }
        }
    }

    fn new_openai(settings: &LlmSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            bail!("OpenAI API key must be provided via PATENT_GUARD_API_KEY");
        }

        let mut builder = openai::Client::builder(&settings.api_key);
        if let Some(endpoint) = settings.endpoint.as_deref() {
            builder = builder.base_url(endpoint);
        }
        let client = builder.build();

        let model_id = settings
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

        let model: Box<dyn CompletionModelDyn + Send + Sync> =
            Box::new(client.completion_model(&model_id));

        Ok(Self::from_model(model, "rig-openai", model_id))
    }

    fn new_anthropic(settings: &LlmSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            bail!("Anthropic API key must be provided via PATENT_GUARD_API_KEY");
        }

        let mut builder = anthropic::ClientBuilder::new(&settings.api_key);
        if let Some(endpoint) = settings.endpoint.as_deref() {
            builder = builder.base_url(endpoint);
        }
        if let Some(version) = settings.api_version.as_deref() {
            builder = builder.anthropic_version(version);
        }
        let client = builder
            .build()
            .context("failed to build anthropic rig client")?;

        let model_id = settings
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());

        let model: Box<dyn CompletionModelDyn + Send + Sync> =
            Box::new(client.completion_model(&model_id));

        Ok(Self::from_model(model, "anthropic", model_id))
    }

    fn new_azure(settings: &LlmSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            bail!("Azure OpenAI API key must be provided via PATENT_GUARD_API_KEY");
        }

        let Some(endpoint) = settings.endpoint.as_deref() else {
            bail!("Azure provider requires PATENT_GUARD_ENDPOINT to be set");
        };

        let deployment = settings
            .deployment
            .as_ref()
            .or(settings.model.as_ref())
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string());

        let Some(deployment) = deployment else {
            bail!(
                "Azure provider requires PATENT_GUARD_DEPLOYMENT or PATENT_GUARD_MODEL to specify the deployment name"
            );
        };

        let auth = AzureOpenAIAuth::ApiKey(settings.api_key.clone());
        let mut builder = azure::Client::builder(auth, endpoint);
        if let Some(version) = settings.api_version.as_deref() {
            builder = builder.api_version(version);
        }
        let client = builder.build();

        let model: Box<dyn CompletionModelDyn + Send + Sync> =
            Box::new(client.completion_model(&deployment));

        Ok(Self::from_model(model, "azure", deployment))
    }

    fn from_model(
        model: Box<dyn CompletionModelDyn + Send + Sync>,
        provider_label: &'static str,
        model_id: String,
    ) -> Self {
        Self {
            model,
            provider_label,
            model_id,
        }
    }
}

#[async_trait]
impl CompletionClient for RigCompletionClient {
    fn provider(&self) -> &str {
        self.provider_label
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let built = self
            .model
            .completion_request(request.prompt.clone().into())
            .preamble(PREAMBLE.to_string())
            .max_tokens(u64::from(request.max_tokens))
            .temperature(f64::from(request.temperature))
            .build();

        let response = self.model.completion(built).await.map_err(|err| {
            tracing::debug!(
                provider = self.provider_label,
                model = %self.model_id,
                error = %err,
                "rig completion request failed"
            );
            map_rig_error(err)
        })?;

        text_from_choice(response.choice, self.provider_label)
    }
}

fn map_rig_error(err: RigError) -> CompletionError {
    match err {
        RigError::ResponseError(text) if text.contains("empty") => CompletionError::EmptyResponse,
        RigError::ResponseError(text) => CompletionError::Malformed(text),
        other => CompletionError::Transient(other.to_string()),
    }
}

fn text_from_choice(
    choice: OneOrMany<AssistantContent>,
    provider_label: &str,
) -> Result<String, CompletionError> {
    let content = choice
        .into_iter()
        .filter_map(|segment| match segment {
            AssistantContent::Text(text) => Some(text.text),
            _ => None,
        })
        .filter(|value| !value.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if debug_enabled() {
        tracing::warn!("rig {} extracted content: {}", provider_label, content);
    }

    if content.trim().is_empty() {
        tracing::warn!(
            "rig {} response did not include textual content",
            provider_label
        );
        return Err(CompletionError::EmptyResponse);
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig::completion::message::Text;

    fn openai_settings() -> LlmSettings {
        LlmSettings {
            provider: "rig-openai".into(),
            api_key: "test-key".into(),
            endpoint: Some("https://example.com".into()),
            model: Some("gpt-test".into()),
            timeout_secs: Some(30),
            ..LlmSettings::default()
        }
    }

    fn azure_settings() -> LlmSettings {
        LlmSettings {
            provider: "azure".into(),
            api_key: "azure-key".into(),
            endpoint: Some("https://example.openai.azure.com".into()),
            model: Some("deployment-name".into()),
            timeout_secs: Some(30),
            api_version: Some("2024-02-15-preview".into()),
            ..LlmSettings::default()
        }
    }

    #[test]
    fn openai_builder_requires_api_key() {
        let mut settings = openai_settings();
        settings.api_key.clear();
        let message = RigCompletionClient::new_openai(&settings)
            .err()
            .expect("missing key should error")
            .to_string();
        assert!(message.contains("API key"));
    }

    #[test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "reqwest default TLS stack unavailable in sandbox"
    )]
    fn openai_builder_defaults_model_when_missing() {
        let mut settings = openai_settings();
        settings.model = None;
        let client =
            RigCompletionClient::new_openai(&settings).expect("client should be constructed");
        assert_eq!(client.model_id, DEFAULT_OPENAI_MODEL);
        assert_eq!(client.provider(), "rig-openai");
    }

    #[test]
    fn azure_requires_endpoint() {
        let mut settings = azure_settings();
        settings.endpoint = None;
        let err = RigCompletionClient::new_azure(&settings)
            .err()
            .expect("missing endpoint should error");
        assert!(err.to_string().to_lowercase().contains("endpoint"));
    }

    #[test]
    fn azure_requires_deployment() {
        let mut settings = azure_settings();
        settings.model = None;
        settings.deployment = None;
        let err = RigCompletionClient::new_azure(&settings)
            .err()
            .expect("missing deployment should error");
        assert!(err.to_string().to_lowercase().contains("deployment"));
    }

    #[test]
    fn for_kind_rejects_direct_providers() {
        let err = RigCompletionClient::for_kind(ProviderKind::Noop, &openai_settings())
            .err()
            .expect("noop is not a rig provider");
        assert!(err.to_string().contains("noop"));
    }

    #[test]
    fn text_from_choice_joins_text_segments() {
        let choice = OneOrMany::one(AssistantContent::Text(Text {
            text: "YES, NO, YES".into(),
        }));
        let text = text_from_choice(choice, "anthropic").expect("text should be extracted");
        assert_eq!(text, "YES, NO, YES");
    }

    #[test]
    fn text_from_choice_empty_is_error() {
        let choice = OneOrMany::one(AssistantContent::Text(Text { text: "  ".into() }));
        let err = text_from_choice(choice, "anthropic").unwrap_err();
        assert!(matches!(err, CompletionError::EmptyResponse));
    }

    #[test]
    fn response_errors_map_to_content_kinds() {
        assert!(matches!(
            map_rig_error(RigError::ResponseError("no message, response was empty".into())),
            CompletionError::EmptyResponse
        ));
        assert!(matches!(
            map_rig_error(RigError::ResponseError("unexpected shape".into())),
            CompletionError::Malformed(_)
        ));
    }
}
