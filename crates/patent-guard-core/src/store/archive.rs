use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};

use crate::analysis::InfringementReport;

/// Directory of saved reports, one file per (patent, company) pair.
///
/// Saving a report for a pair that already has one replaces it. File names
/// percent-encode both identifiers, so distinct pairs never share a file on a
/// case-sensitive filesystem; the stored pair is still checked on every read
/// and write.
pub struct ReportArchive {
    dir: PathBuf,
}

impl ReportArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, patent_id: &str, company_name: &str) -> PathBuf {
        // `+` is always encoded, so it cannot occur inside either part.
        self.dir.join(format!(
            "{}+{}.json",
            urlencoding::encode(patent_id.trim()),
            urlencoding::encode(company_name.trim())
        ))
    }

    pub fn save(&self, report: &InfringementReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create archive dir {}", self.dir.display()))?;
        let path = self.path_for(&report.patent_id, &report.company_name);
        if let Some(existing) = read_report(&path)? {
            if !same_pair(&existing, &report.patent_id, &report.company_name) {
                bail!(
                    "{} already holds the report for patent `{}` and company `{}`",
                    path.display(),
                    existing.patent_id,
                    existing.company_name
                );
            }
        }
        let body = serde_json::to_string_pretty(report)?;
        fs::write(&path, body)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            analysis_id = %report.analysis_id,
            "report archived"
        );
        Ok(path)
    }

    /// Return the stored report for exactly this pair, if any.
    pub fn load(&self, patent_id: &str, company_name: &str) -> Result<Option<InfringementReport>> {
        let path = self.path_for(patent_id, company_name);
        let Some(report) = read_report(&path)? else {
            return Ok(None);
        };
        if !same_pair(&report, patent_id, company_name) {
            tracing::warn!(
                path = %path.display(),
                stored_patent = %report.patent_id,
                stored_company = %report.company_name,
                "archived report belongs to a different pair"
            );
            return Ok(None);
        }
        Ok(Some(report))
    }
}

fn read_report(path: &Path) -> Result<Option<InfringementReport>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read report at {}", path.display()))?;
    let report = serde_json::from_str(&content)
        .with_context(|| format!("invalid report JSON in {}", path.display()))?;
    Ok(Some(report))
}

fn same_pair(report: &InfringementReport, patent_id: &str, company_name: &str) -> bool {
    report.patent_id.trim() == patent_id.trim() && report.company_name.trim() == company_name.trim()
}
