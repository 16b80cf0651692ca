use std::{fmt, time::Duration};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::llm::{normalize_response, CompletionClient, CompletionError, CompletionRequest};

pub mod claims;
pub mod explanation;
pub mod features;
pub mod product;
pub mod prompts;
pub mod report_builder;

#[cfg(test)]
pub(crate) mod testing;

/// Coarse infringement-risk label derived from the relevant-claim count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Likelihood {
    Low,
    Moderate,
    High,
}

impl Likelihood {
    /// Map a relevant-claim count into a likelihood category.
    pub fn from_claim_count(count: usize) -> Self {
        if count > 5 {
            Self::High
        } else if count > 2 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    /// Ordinal used as the primary ranking key.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Moderate => 2,
            Self::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Moderate => "Moderate",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Likelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-product outcome of an infringement analysis.
///
/// The likelihood is always derived from `relevant_claims`; it cannot be set
/// independently, including when a finding is read back from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FindingRecord")]
pub struct ProductFinding {
    product_name: String,
    infringement_likelihood: Likelihood,
    relevant_claims: Vec<String>,
    explanation: String,
    specific_features: Vec<String>,
}

impl ProductFinding {
    pub fn new(
        product_name: impl Into<String>,
        relevant_claims: Vec<String>,
        explanation: impl Into<String>,
        specific_features: Vec<String>,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            infringement_likelihood: Likelihood::from_claim_count(relevant_claims.len()),
            relevant_claims,
            explanation: explanation.into(),
            specific_features,
        }
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn likelihood(&self) -> Likelihood {
        self.infringement_likelihood
    }

    pub fn relevant_claims(&self) -> &[String] {
        &self.relevant_claims
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn specific_features(&self) -> &[String] {
        &self.specific_features
    }

    /// Composite ranking key: likelihood ordinal, then relevant-claim count.
    pub fn rank_key(&self) -> (u8, usize) {
        (self.infringement_likelihood.rank(), self.relevant_claims.len())
    }
}

#[derive(Deserialize)]
struct FindingRecord {
    product_name: String,
    relevant_claims: Vec<String>,
    explanation: String,
    specific_features: Vec<String>,
}

impl From<FindingRecord> for ProductFinding {
    fn from(record: FindingRecord) -> Self {
        Self::new(
            record.product_name,
            record.relevant_claims,
            record.explanation,
            record.specific_features,
        )
    }
}

/// Ranked report for one patent against one company's products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfringementReport {
    pub analysis_id: Uuid,
    pub patent_id: String,
    pub patent_title: String,
    pub company_name: String,
    pub analysis_date: NaiveDate,
    pub top_infringing_products: Vec<ProductFinding>,
    pub overall_risk_assessment: String,
}

/// Output budget and sampling temperature for one prompt kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl StageParams {
    pub const fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }

    pub(crate) fn request(&self, prompt: String) -> CompletionRequest {
        CompletionRequest::new(prompt, self.max_tokens, self.temperature)
    }
}

/// Tunable knobs for the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Claims sent to the model per relevance prompt.
    pub batch_size: usize,
    /// Number of ranked findings kept in the report.
    pub top_n: usize,
    /// Upper bound for every single completion call.
    #[serde(with = "duration_text")]
    pub call_timeout: Duration,
    /// Products (and claim batches within a product) analysed at once.
    pub max_concurrency: usize,
    pub claims: StageParams,
    pub explanation: StageParams,
    pub features: StageParams,
    pub narrative: StageParams,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            top_n: 2,
            call_timeout: Duration::from_secs(30),
            max_concurrency: 4,
            claims: StageParams::new(60, 0.3),
            explanation: StageParams::new(200, 0.7),
            features: StageParams::new(150, 0.5),
            narrative: StageParams::new(200, 0.7),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.batch_size == 0 {
            return Err(AnalysisError::InvalidConfig("batch_size must be > 0".into()));
        }
        if self.top_n == 0 {
            return Err(AnalysisError::InvalidConfig("top_n must be > 0".into()));
        }
        if self.call_timeout.is_zero() {
            return Err(AnalysisError::InvalidConfig(
                "call_timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

mod duration_text {
    use std::time::Duration;

    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(D::Error::custom)
    }
}

/// Pipeline step that issued a completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Explanation,
    Features,
    Narrative,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Explanation => "explanation",
            Self::Features => "feature extraction",
            Self::Narrative => "risk narrative",
        };
        f.write_str(label)
    }
}

/// Failures that escape the analysis pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnalysisError {
    #[error("patent `{0}` not found")]
    PatentNotFound(String),
    #[error("company `{0}` not found")]
    CompanyNotFound(String),
    #[error("{stage} failed for `{subject}`: {source}")]
    Completion {
        stage: Stage,
        subject: String,
        #[source]
        source: CompletionError,
    },
    #[error("data store lookup failed: {0:#}")]
    Store(anyhow::Error),
    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),
}

impl AnalysisError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PatentNotFound(_) | Self::CompanyNotFound(_))
    }

    /// Completion failures are worth retrying as a whole request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Completion { .. })
    }

    /// Caller-facing text that never includes internal error details.
    pub fn user_message(&self) -> String {
        match self {
            Self::PatentNotFound(id) => {
                format!("Analysis unavailable: patent `{id}` was not found.")
            }
            Self::CompanyNotFound(name) => {
                format!("Analysis unavailable: company `{name}` was not found.")
            }
            Self::Completion { .. } => {
                "Analysis unavailable: the language model service did not respond. Please retry."
                    .to_string()
            }
            Self::Store(_) | Self::InvalidConfig(_) => {
                "Analysis unavailable: an internal error occurred.".to_string()
            }
        }
    }
}

/// Issue one completion call bounded by `timeout`, returning normalised text.
pub(crate) async fn request_text(
    client: &dyn CompletionClient,
    request: &CompletionRequest,
    timeout: Duration,
) -> Result<String, CompletionError> {
    let raw = tokio::time::timeout(timeout, client.complete(request))
        .await
        .map_err(|_| CompletionError::Timeout(timeout))??;
    let text = normalize_response(&raw);
    if text.is_empty() {
        return Err(CompletionError::EmptyResponse);
    }
    Ok(text)
}
