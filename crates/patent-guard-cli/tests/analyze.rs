mod common;

use std::fs::write;

use predicates::prelude::*;

use common::{cli, write_fixtures};

#[test]
fn analyze_with_noop_provider() {
    let temp = tempfile::tempdir().unwrap();
    write_fixtures(temp.path());

    cli(temp.path())
        .env("PATENT_GUARD_PROVIDER", "noop")
        .args(["analyze", "--patent", "US-1-B2", "--company", "Acme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Patent: Wireless charging (US-1-B2)"))
        .stdout(predicate::str::contains("1. Charger [Low]"))
        .stdout(predicate::str::contains("2. Case [Low]"))
        .stdout(predicate::str::contains("Overall Risk Assessment"));
}

#[test]
fn analyze_json_is_archived_and_shown() {
    let temp = tempfile::tempdir().unwrap();
    write_fixtures(temp.path());
    let archive = temp.path().join("reports");

    let output = cli(temp.path())
        .env("PATENT_GUARD_PROVIDER", "noop")
        .args(["analyze", "--patent", "US-1-B2", "--company", "Acme", "--json"])
        .arg("--archive")
        .arg(&archive)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["patent_id"], "US-1-B2");
    assert_eq!(report["company_name"], "Acme");
    let top = report["top_infringing_products"].as_array().unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["infringement_likelihood"], "Low");
    assert!(top[0]["relevant_claims"].as_array().unwrap().is_empty());

    cli(temp.path())
        .args(["show-report", "--patent", "US-1-B2", "--company", "Acme", "--json"])
        .arg("--archive")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains(report["analysis_id"].as_str().unwrap()));
}

#[test]
fn company_without_products_gets_fixed_narrative() {
    let temp = tempfile::tempdir().unwrap();
    write_fixtures(temp.path());

    cli(temp.path())
        .env("PATENT_GUARD_PROVIDER", "noop")
        .args(["analyze", "--patent", "US-1-B2", "--company", "Empty Co"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No products analyzed."))
        .stdout(predicate::str::contains("No products were analyzed for Empty Co"));
}

#[test]
fn unknown_company_is_not_found() {
    let temp = tempfile::tempdir().unwrap();
    write_fixtures(temp.path());

    cli(temp.path())
        .env("PATENT_GUARD_PROVIDER", "noop")
        .args(["analyze", "--patent", "US-1-B2", "--company", "Nobody"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Analysis unavailable: company `Nobody` was not found."));
}

#[test]
fn missing_api_key_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    write_fixtures(temp.path());

    cli(temp.path())
        .args(["analyze", "--patent", "US-1-B2", "--company", "Acme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("PATENT_GUARD_API_KEY"));
}

#[test]
fn config_file_sets_provider_and_top_n() {
    let temp = tempfile::tempdir().unwrap();
    write_fixtures(temp.path());
    let config = temp.path().join("patent-guard.toml");
    write(
        &config,
        "[llm]\nprovider = \"noop\"\n\n[analysis]\ntop_n = 1\ncall_timeout = \"5s\"\n",
    )
    .unwrap();

    let output = cli(temp.path())
        .arg("--config")
        .arg(&config)
        .args(["analyze", "--patent", "US-1-B2", "--company", "Acme", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["top_infringing_products"].as_array().unwrap().len(), 1);
}

#[test]
fn lists_companies_and_patents() {
    let temp = tempfile::tempdir().unwrap();
    write_fixtures(temp.path());

    cli(temp.path())
        .arg("list-companies")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 company(s) loaded"))
        .stdout(predicate::str::contains("- Empty Co"));

    cli(temp.path())
        .args(["list-patents", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"US-1-B2\""));
}
