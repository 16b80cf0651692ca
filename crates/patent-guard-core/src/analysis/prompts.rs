//! Prompt templates for each analysis step.
//!
//! Every builder is a pure function of its inputs so prompts can be asserted
//! on directly in tests.

use crate::store::Claim;

use super::ProductFinding;

/// Ask for one YES/NO verdict per claim, in batch order.
pub fn build_relevance_prompt(product_description: &str, batch: &[Claim]) -> String {
    let claims_text = batch
        .iter()
        .map(|claim| format!("Claim {}: {}", claim.number, claim.text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze if the product potentially infringes each of the following patent claims.\n\
         Respond with ONLY a comma-separated list of YES or NO for each claim in order.\n\n\
         Product description: {product_description}\n\n\
         Claims to analyze:\n{claims_text}\n"
    )
}

pub fn build_explanation_prompt(
    patent_title: &str,
    product_name: &str,
    product_description: &str,
    relevant_claims: &[String],
) -> String {
    format!(
        "Generate a concise explanation of why this product potentially infringes the patent.\n\n\
         Product: {product_name}\n\
         Description: {product_description}\n\
         Patent title: {patent_title}\n\
         Relevant claims: {claims}\n\n\
         Format the explanation in 2-3 sentences focusing on specific technical similarities.\n",
        claims = relevant_claims.join(", ")
    )
}

pub fn build_features_prompt(
    product_description: &str,
    patent_title: &str,
    patent_abstract: &str,
) -> String {
    format!(
        "List 3-5 specific technical features from the product that might infringe the patent.\n\n\
         Product description: {product_description}\n\
         Patent title: {patent_title}\n\
         Patent abstract: {patent_abstract}\n\n\
         Format as a simple list of features, one per line.\n"
    )
}

/// Summarise every analysed product and the ranked top list.
pub fn build_narrative_prompt(
    patent_title: &str,
    patent_id: &str,
    company_name: &str,
    analyzed_products: &[&str],
    top: &[ProductFinding],
) -> String {
    let all_products = analyzed_products.join("\n");
    let top_products = top
        .iter()
        .enumerate()
        .map(|(idx, finding)| {
            format!(
                "{}. {} - {} likelihood",
                idx + 1,
                finding.product_name(),
                finding.likelihood()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Generate an overall risk assessment for patent infringement based on these products:\n\n\
         Patent: {patent_title} ({patent_id})\n\
         Company: {company_name}\n\n\
         Products analyzed:\n{all_products}\n\n\
         Top potentially infringing products:\n{top_products}\n\n\
         Format the assessment in 2-3 sentences.\n"
    )
}

/// Fixed narrative for a company with nothing to analyse.
pub fn empty_company_narrative(company_name: &str) -> String {
    format!(
        "No products were analyzed for {company_name}; no infringement risk could be assessed."
    )
}
