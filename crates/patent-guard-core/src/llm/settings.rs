use anyhow::{Context, Result};
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};

/// Environment-driven configuration required for completion adapters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LlmSettings {
    pub provider: String,
    pub api_key: String,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub deployment: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: u32,
    pub api_version: Option<String>,
}

/// Optional values from a configuration file `[llm]` table.
///
/// Environment variables win over these when both are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmOverrides {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub deployment: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub api_version: Option<String>,
}

impl LlmSettings {
    const PROVIDER_ENV: &'static str = "PATENT_GUARD_PROVIDER";
    const API_KEY_ENV: &'static str = "PATENT_GUARD_API_KEY";
    const ENDPOINT_ENV: &'static str = "PATENT_GUARD_ENDPOINT";
    const MODEL_ENV: &'static str = "PATENT_GUARD_MODEL";
    const DEPLOYMENT_ENV: &'static str = "PATENT_GUARD_DEPLOYMENT";
    const TIMEOUT_ENV: &'static str = "PATENT_GUARD_TIMEOUT_SECS";
    const RETRIES_ENV: &'static str = "PATENT_GUARD_MAX_RETRIES";
    const API_VERSION_ENV: &'static str = "PATENT_GUARD_API_VERSION";

    /// Load settings from environment variables, falling back to file overrides.
    ///
    /// * `PATENT_GUARD_PROVIDER`: provider identifier (default: `openai`).
    /// * `PATENT_GUARD_API_KEY`: API key/token (required unless provider is `noop`).
    /// * `PATENT_GUARD_ENDPOINT`: optional custom endpoint/base URL.
    pub fn from_env_with(overrides: LlmOverrides) -> Result<Self> {
        Self::from_sources(std::env::vars().collect(), overrides)
    }

    /// Fit the per-attempt HTTP timeout inside `budget`, the bound applied to
    /// a whole completion call, so every retry can run before it expires.
    ///
    /// An explicit `timeout_secs` is kept; one that cannot fit all attempts is
    /// logged.
    pub fn fit_to_call_budget(mut self, budget: Duration) -> Self {
        let attempts = u64::from(self.max_retries) + 1;
        match self.timeout_secs {
            None => {
                self.timeout_secs = Some((budget.as_secs() / attempts).max(1));
            }
            Some(secs) if secs.saturating_mul(attempts) > budget.as_secs() => {
                tracing::warn!(
                    timeout_secs = secs,
                    attempts,
                    budget = %humantime::format_duration(budget),
                    "provider timeout leaves no room for retries within the call timeout"
                );
            }
            Some(_) => {}
        }
        self
    }

    fn from_sources(vars: HashMap<String, String>, overrides: LlmOverrides) -> Result<Self> {
        let text = |key: &str, fallback: Option<String>| {
            vars.get(key)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .or(fallback.filter(|v| !v.trim().is_empty()))
                .map(|v| v.trim().to_string())
        };

        let provider = text(Self::PROVIDER_ENV, overrides.provider)
            .unwrap_or_else(|| "openai".to_string());
        let api_key = match provider.to_lowercase().as_str() {
            "noop" => text(Self::API_KEY_ENV, overrides.api_key).unwrap_or_default(),
            _ => text(Self::API_KEY_ENV, overrides.api_key).with_context(|| {
                format!(
                    "environment variable {} must be set for provider `{}`",
                    Self::API_KEY_ENV,
                    provider
                )
            })?,
        };
        let timeout_secs = vars
            .get(Self::TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .or(overrides.timeout_secs);
        let max_retries = vars
            .get(Self::RETRIES_ENV)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .or(overrides.max_retries)
            .unwrap_or(2);

        Ok(Self {
            provider,
            api_key,
            endpoint: text(Self::ENDPOINT_ENV, overrides.endpoint),
            model: text(Self::MODEL_ENV, overrides.model),
            deployment: text(Self::DEPLOYMENT_ENV, overrides.deployment),
            timeout_secs,
            max_retries,
            api_version: text(Self::API_VERSION_ENV, overrides.api_version),
        })
    }
}
