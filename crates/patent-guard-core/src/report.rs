use std::fmt::Write;

use crate::analysis::InfringementReport;

/// Format styles supported by the report renderer.
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Produce a report string from an `InfringementReport` using the desired format.
pub fn render_report(report: &InfringementReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(report),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

fn render_human(report: &InfringementReport) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "Patent: {} ({})", report.patent_title, report.patent_id)?;
    writeln!(out, "Company: {}", report.company_name)?;
    writeln!(
        out,
        "Analysis: {} on {}",
        report.analysis_id,
        report.analysis_date.format("%Y-%m-%d")
    )?;
    writeln!(out)?;

    if report.top_infringing_products.is_empty() {
        writeln!(out, "No products analyzed.")?;
    } else {
        writeln!(out, "Top Infringing Products:")?;
        for (idx, finding) in report.top_infringing_products.iter().enumerate() {
            writeln!(
                out,
                "  {rank}. {name} [{likelihood}] ({count} relevant claim(s))",
                rank = idx + 1,
                name = finding.product_name(),
                likelihood = finding.likelihood(),
                count = finding.relevant_claims().len(),
            )?;
            if !finding.explanation().trim().is_empty() {
                writeln!(out, "     {}", single_line(finding.explanation()))?;
            }
            for feature in finding.specific_features() {
                writeln!(out, "     - {}", single_line(feature))?;
            }
        }
    }

    writeln!(
        out,
        "\nOverall Risk Assessment:\n  {}",
        single_line(&report.overall_risk_assessment)
    )?;

    Ok(out)
}

fn single_line(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\n' | '\r' => ' ',
            _ => c,
        })
        .collect()
}
