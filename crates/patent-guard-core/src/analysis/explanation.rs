use std::{sync::Arc, time::Duration};

use tracing::debug;

use super::{prompts::build_explanation_prompt, request_text, StageParams};
use crate::llm::{CompletionClient, CompletionError};
use crate::store::Product;

/// Produces a short rationale for one product's finding.
pub struct ExplanationGenerator {
    client: Arc<dyn CompletionClient>,
    params: StageParams,
    timeout: Duration,
}

impl ExplanationGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, params: StageParams, timeout: Duration) -> Self {
        Self {
            client,
            params,
            timeout,
        }
    }

    /// Generate the explanation. An empty claim list still yields a
    /// rationale; failures are returned to the caller unchanged.
    pub async fn explain(
        &self,
        patent_title: &str,
        product: &Product,
        relevant_claims: &[String],
    ) -> Result<String, CompletionError> {
        let prompt = build_explanation_prompt(
            patent_title,
            &product.name,
            &product.description,
            relevant_claims,
        );
        let request = self.params.request(prompt);
        let text = request_text(self.client.as_ref(), &request, self.timeout).await?;
        debug!(product = %product.name, chars = text.len(), "explanation generated");
        Ok(text)
    }
}
