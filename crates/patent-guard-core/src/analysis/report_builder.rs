use std::sync::Arc;

use chrono::Utc;
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    product::ProductAnalyzer,
    prompts::{build_narrative_prompt, empty_company_narrative},
    request_text, AnalysisConfig, AnalysisError, InfringementReport, ProductFinding, Stage,
};
use crate::llm::CompletionClient;
use crate::store::{Company, Patent, PatentStore};

/// Builds ranked infringement reports for a patent against a company.
pub struct ReportBuilder {
    store: Arc<dyn PatentStore>,
    client: Arc<dyn CompletionClient>,
    analyzer: ProductAnalyzer,
    config: AnalysisConfig,
}

impl ReportBuilder {
    pub fn new(
        store: Arc<dyn PatentStore>,
        client: Arc<dyn CompletionClient>,
        config: AnalysisConfig,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            analyzer: ProductAnalyzer::new(Arc::clone(&client), &config),
            store,
            client,
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Resolve both records, analyse every product, rank and summarise.
    ///
    /// Either lookup missing yields a not-found error and no report. The
    /// first product failure aborts the request; dropping the returned
    /// future discards every in-flight completion call.
    #[instrument(name = "build_report", skip(self))]
    pub async fn build(
        &self,
        patent_id: &str,
        company_name: &str,
    ) -> Result<InfringementReport, AnalysisError> {
        let patent = self
            .store
            .find_patent(patent_id)
            .await
            .map_err(AnalysisError::Store)?
            .ok_or_else(|| AnalysisError::PatentNotFound(patent_id.trim().to_string()))?;
        let company = self
            .store
            .find_company(company_name)
            .await
            .map_err(AnalysisError::Store)?
            .ok_or_else(|| AnalysisError::CompanyNotFound(company_name.trim().to_string()))?;

        let findings = self.analyze_products(&patent, &company).await?;
        let analyzed: Vec<String> = findings
            .iter()
            .map(|finding| finding.product_name().to_string())
            .collect();

        let mut top = rank_findings(findings);
        top.truncate(self.config.top_n);

        let overall_risk_assessment = if analyzed.is_empty() {
            empty_company_narrative(&company.name)
        } else {
            let names: Vec<&str> = analyzed.iter().map(String::as_str).collect();
            self.narrative(&patent, &company, &names, &top).await?
        };

        info!(
            products = analyzed.len(),
            top = top.len(),
            "infringement report built"
        );

        Ok(InfringementReport {
            analysis_id: Uuid::new_v4(),
            patent_id: patent.publication_number,
            patent_title: patent.title,
            company_name: company.name,
            analysis_date: Utc::now().date_naive(),
            top_infringing_products: top,
            overall_risk_assessment,
        })
    }

    /// Fan out over products; results come back in product order.
    async fn analyze_products(
        &self,
        patent: &Patent,
        company: &Company,
    ) -> Result<Vec<ProductFinding>, AnalysisError> {
        stream::iter(company.products.iter())
            .map(|product| self.analyzer.analyze(patent, product))
            .buffered(self.config.concurrency())
            .try_collect()
            .await
    }

    async fn narrative(
        &self,
        patent: &Patent,
        company: &Company,
        analyzed: &[&str],
        top: &[ProductFinding],
    ) -> Result<String, AnalysisError> {
        let prompt = build_narrative_prompt(
            &patent.title,
            &patent.publication_number,
            &company.name,
            analyzed,
            top,
        );
        let request = self.config.narrative.request(prompt);
        request_text(self.client.as_ref(), &request, self.config.call_timeout)
            .await
            .map_err(|source| AnalysisError::Completion {
                stage: Stage::Narrative,
                subject: company.name.clone(),
                source,
            })
    }
}

/// Order findings by likelihood, then relevant-claim count, both descending.
/// Ties keep their input order.
pub fn rank_findings(mut findings: Vec<ProductFinding>) -> Vec<ProductFinding> {
    findings.sort_by(|a, b| b.rank_key().cmp(&a.rank_key()));
    findings
}
