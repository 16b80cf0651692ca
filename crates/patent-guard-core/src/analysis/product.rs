use std::sync::Arc;

use tracing::{debug, instrument};

use super::{
    claims::ClaimRelevanceScorer, explanation::ExplanationGenerator, features::FeatureExtractor,
    AnalysisConfig, AnalysisError, ProductFinding, Stage,
};
use crate::llm::CompletionClient;
use crate::store::{Patent, Product};

/// Runs claim scoring, explanation and feature extraction for one product.
pub struct ProductAnalyzer {
    scorer: ClaimRelevanceScorer,
    explainer: ExplanationGenerator,
    features: FeatureExtractor,
}

impl ProductAnalyzer {
    pub fn new(client: Arc<dyn CompletionClient>, config: &AnalysisConfig) -> Self {
        Self {
            scorer: ClaimRelevanceScorer::new(
                Arc::clone(&client),
                config.batch_size,
                config.claims,
                config.call_timeout,
                config.concurrency(),
            ),
            explainer: ExplanationGenerator::new(
                Arc::clone(&client),
                config.explanation,
                config.call_timeout,
            ),
            features: FeatureExtractor::new(client, config.features, config.call_timeout),
        }
    }

    #[instrument(
        name = "analyze_product",
        skip_all,
        fields(patent = %patent.publication_number, product = %product.name)
    )]
    pub async fn analyze(
        &self,
        patent: &Patent,
        product: &Product,
    ) -> Result<ProductFinding, AnalysisError> {
        let relevant_claims = self
            .scorer
            .relevant_claims(&patent.claims, &product.description)
            .await;
        debug!(relevant = relevant_claims.len(), "claims scored");

        let explanation = self
            .explainer
            .explain(&patent.title, product, &relevant_claims)
            .await
            .map_err(|source| AnalysisError::Completion {
                stage: Stage::Explanation,
                subject: product.name.clone(),
                source,
            })?;

        let specific_features = self
            .features
            .extract(&product.description, &patent.title, &patent.abstract_text)
            .await
            .map_err(|source| AnalysisError::Completion {
                stage: Stage::Features,
                subject: product.name.clone(),
                source,
            })?;

        let finding = ProductFinding::new(
            product.name.clone(),
            relevant_claims,
            explanation,
            specific_features,
        );
        debug!(likelihood = %finding.likelihood(), "product analysed");
        Ok(finding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{
        pipeline_client, pipeline_response, ScriptedClient, EXPLANATION_MARKER, FEATURES_MARKER,
        RELEVANCE_MARKER,
    };
    use crate::analysis::Likelihood;
    use crate::llm::CompletionError;
    use crate::store::Claim;

    fn patent(claim_count: usize) -> Patent {
        let claims = (1..=claim_count)
            .map(|i| Claim::new(i.to_string(), format!("A wireless coil variant {i}")))
            .collect();
        Patent::new("US-1-B2", "Wireless charging", "Charging pad abstract.", claims).unwrap()
    }

    #[tokio::test]
    async fn assembles_finding_in_order() {
        let client = pipeline_client("wireless");
        let analyzer = ProductAnalyzer::new(Arc::new(client.clone()), &AnalysisConfig::default());
        let finding = analyzer
            .analyze(&patent(7), &Product::new("Pad", "Wireless pad"))
            .await
            .unwrap();

        assert_eq!(finding.product_name(), "Pad");
        assert_eq!(finding.relevant_claims().len(), 7);
        assert_eq!(finding.likelihood(), Likelihood::High);
        assert_eq!(
            finding.specific_features(),
            ["Coil array", "Alignment magnets", "Foreign object detection"]
        );

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[0].contains(RELEVANCE_MARKER));
        assert!(prompts[1].contains(RELEVANCE_MARKER));
        assert!(prompts[2].contains(EXPLANATION_MARKER));
        assert!(prompts[3].contains(FEATURES_MARKER));
    }

    #[tokio::test]
    async fn blank_description_still_explains() {
        let client = pipeline_client("wireless");
        let analyzer = ProductAnalyzer::new(Arc::new(client.clone()), &AnalysisConfig::default());
        let finding = analyzer
            .analyze(&patent(3), &Product::new("Mystery", "   "))
            .await
            .unwrap();
        assert!(finding.relevant_claims().is_empty());
        assert_eq!(finding.likelihood(), Likelihood::Low);
        assert_eq!(client.calls_containing(RELEVANCE_MARKER), 0);
        assert_eq!(client.calls_containing(EXPLANATION_MARKER), 1);
    }

    #[tokio::test]
    async fn blank_features_reply_yields_empty_list() {
        let client = ScriptedClient::new(|request| {
            if request.prompt.contains(FEATURES_MARKER) {
                Ok("\n\n   \n".into())
            } else {
                pipeline_response(request, "wireless")
            }
        });
        let analyzer = ProductAnalyzer::new(Arc::new(client), &AnalysisConfig::default());
        let finding = analyzer
            .analyze(&patent(3), &Product::new("Pad", "Wireless pad"))
            .await
            .unwrap();
        assert!(finding.specific_features().is_empty());
        assert_eq!(finding.likelihood(), Likelihood::Moderate);
    }

    #[tokio::test]
    async fn features_failure_stops_analysis() {
        let client = ScriptedClient::new(|request| {
            if request.prompt.contains(FEATURES_MARKER) {
                Err(CompletionError::Transient("upstream 503".into()))
            } else {
                pipeline_response(request, "wireless")
            }
        });
        let analyzer = ProductAnalyzer::new(Arc::new(client), &AnalysisConfig::default());
        let err = analyzer
            .analyze(&patent(3), &Product::new("Pad", "Wireless pad"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Completion {
                stage: Stage::Features,
                source: CompletionError::Transient(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn explanation_failure_stops_analysis() {
        let client = ScriptedClient::new(|request| {
            if request.prompt.contains(EXPLANATION_MARKER) {
                Err(CompletionError::Timeout(std::time::Duration::from_secs(30)))
            } else {
                Ok("YES".into())
            }
        });
        let analyzer = ProductAnalyzer::new(Arc::new(client.clone()), &AnalysisConfig::default());
        let err = analyzer
            .analyze(&patent(1), &Product::new("Pad", "Wireless pad"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Completion { stage: Stage::Explanation, ref subject, .. } if subject == "Pad"
        ));
        assert_eq!(client.calls_containing(FEATURES_MARKER), 0);
    }
}
