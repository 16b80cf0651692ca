//! Batched claim-relevance scoring.
//!
//! Claims are sent to the model in fixed-size batches, one prompt per batch.
//! The reply is read as a comma-separated list of verdicts paired with the
//! batch's claims in order. Parsing is lenient: a short reply only marks the
//! claims it covers, so trailing claims without a verdict count as not
//! relevant, and extra tokens are ignored.

use std::{sync::Arc, time::Duration};

use futures::{stream, StreamExt};
use tracing::{debug, instrument, warn};

use super::{prompts::build_relevance_prompt, request_text, StageParams};
use crate::llm::CompletionClient;
use crate::store::Claim;

/// Decides which of a patent's claims a product description plausibly touches.
pub struct ClaimRelevanceScorer {
    client: Arc<dyn CompletionClient>,
    batch_size: usize,
    params: StageParams,
    timeout: Duration,
    concurrency: usize,
}

impl ClaimRelevanceScorer {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        batch_size: usize,
        params: StageParams,
        timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            batch_size: batch_size.max(1),
            params,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    /// Return the texts of relevant claims, in original claim order.
    ///
    /// A blank description short-circuits to no relevant claims without
    /// contacting the model. A batch whose call fails contributes nothing.
    #[instrument(name = "score_claims", skip_all, fields(claims = claims.len()))]
    pub async fn relevant_claims(
        &self,
        claims: &[Claim],
        product_description: &str,
    ) -> Vec<String> {
        let description = product_description.trim();
        if description.is_empty() {
            debug!("blank product description; skipping claim scoring");
            return Vec::new();
        }

        let batches: Vec<&[Claim]> = claims.chunks(self.batch_size).collect();
        let per_batch: Vec<Vec<String>> = stream::iter(batches.into_iter().enumerate())
            .map(|(index, batch)| self.score_batch(index, batch, description))
            .buffered(self.concurrency)
            .collect()
            .await;

        per_batch.into_iter().flatten().collect()
    }

    async fn score_batch(&self, index: usize, batch: &[Claim], description: &str) -> Vec<String> {
        let request = self.params.request(build_relevance_prompt(description, batch));
        match request_text(self.client.as_ref(), &request, self.timeout).await {
            Ok(text) => {
                let verdicts = parse_verdicts(&text);
                if verdicts.len() != batch.len() {
                    debug!(
                        batch = index,
                        expected = batch.len(),
                        received = verdicts.len(),
                        "verdict count mismatch; pairing leniently"
                    );
                }
                select_relevant(batch, &verdicts)
            }
            Err(err) => {
                warn!(
                    batch = index,
                    claims = batch.len(),
                    error = %err,
                    "claim batch scoring failed; treating batch as not relevant"
                );
                Vec::new()
            }
        }
    }
}

/// Split a reply on commas; a token is a YES verdict when its uppercase form
/// contains `YES`.
pub fn parse_verdicts(response: &str) -> Vec<bool> {
    if response.trim().is_empty() {
        return Vec::new();
    }
    response
        .split(',')
        .map(|token| token.trim().to_uppercase().contains("YES"))
        .collect()
}

/// Pair verdicts with claims positionally and keep the relevant claim texts.
pub fn select_relevant(batch: &[Claim], verdicts: &[bool]) -> Vec<String> {
    batch
        .iter()
        .zip(verdicts)
        .filter(|(_, relevant)| **relevant)
        .map(|(claim, _)| claim.text.clone())
        .collect()
}
