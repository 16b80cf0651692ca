pub mod analysis;
pub mod llm;
pub mod report;
pub mod store;

pub use analysis::{
    claims::ClaimRelevanceScorer, explanation::ExplanationGenerator, features::FeatureExtractor,
    product::ProductAnalyzer, report_builder::ReportBuilder, AnalysisConfig, AnalysisError,
    InfringementReport, Likelihood, ProductFinding, StageParams,
};
pub use llm::{
    build_client, CompletionClient, CompletionError, CompletionRequest, LlmOverrides, LlmSettings,
    NoopCompletionClient,
};
pub use report::{render_report, OutputFormat};
pub use store::{
    archive::ReportArchive, file_store::JsonFileStore, Claim, Company, InMemoryStore, Patent,
    PatentStore, Product, RecordValidationError,
};
