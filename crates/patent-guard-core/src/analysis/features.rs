use std::{sync::Arc, time::Duration};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{prompts::build_features_prompt, request_text, StageParams};
use crate::llm::{CompletionClient, CompletionError};

// Bullets (`-`, `*`, `•`) or numbering (`1.`, `2)`) at the start of a line.
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-*•]+\s*|\d{1,2}[.)]\s+)").expect("list marker regex is valid")
});

/// Lists product features implicated by a patent.
pub struct FeatureExtractor {
    client: Arc<dyn CompletionClient>,
    params: StageParams,
    timeout: Duration,
}

impl FeatureExtractor {
    pub fn new(client: Arc<dyn CompletionClient>, params: StageParams, timeout: Duration) -> Self {
        Self {
            client,
            params,
            timeout,
        }
    }

    /// A blank reply yields no features; transport and timeout failures
    /// are returned to the caller.
    pub async fn extract(
        &self,
        product_description: &str,
        patent_title: &str,
        patent_abstract: &str,
    ) -> Result<Vec<String>, CompletionError> {
        let prompt = build_features_prompt(product_description, patent_title, patent_abstract);
        let request = self.params.request(prompt);
        match request_text(self.client.as_ref(), &request, self.timeout).await {
            Ok(text) => Ok(parse_features(&text)),
            Err(CompletionError::EmptyResponse) => {
                debug!("features reply was blank");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

/// One feature per non-empty line, list markers and whitespace removed.
///
/// No minimum or maximum count is enforced.
pub fn parse_features(response: &str) -> Vec<String> {
    response
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            LIST_MARKER.replace(trimmed, "").trim().to_string()
        })
        .filter(|feature| !feature.is_empty())
        .collect()
}
