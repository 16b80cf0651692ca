use std::{fs, path::Path};

use assert_cmd::Command;

pub const PATENTS: &str = r#"[
  {
    "publication_number": "US-1-B2",
    "title": "Wireless charging",
    "abstract": "A charging pad with alignment magnets.",
    "description": "",
    "assignee": "Acme IP",
    "inventors": ["Ada"],
    "priority_date": "2020-01-31",
    "application_date": "bogus",
    "grant_date": null,
    "claims": [
      {"num": "1", "text": "A charging pad comprising a coil."},
      {"num": "2", "text": "The pad of claim 1 with magnets."}
    ],
    "jurisdictions": "US",
    "classifications": []
  }
]"#;

pub const COMPANIES: &str = r#"{
  "companies": [
    {
      "name": "Acme",
      "products": [
        {"name": "Charger", "description": "Magnetic wireless charger"},
        {"name": "Case", "description": "Phone case"},
        {"name": "App", "description": "Mobile ordering"}
      ]
    },
    {"name": "Empty Co", "products": []}
  ]
}"#;

pub fn write_fixtures(dir: &Path) {
    fs::write(dir.join("patents.json"), PATENTS).unwrap();
    fs::write(dir.join("company_products.json"), COMPANIES).unwrap();
}

/// Binary invocation pointed at fixture files with a clean provider environment.
pub fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("patent-guard").unwrap();
    for var in [
        "PATENT_GUARD_PROVIDER",
        "PATENT_GUARD_API_KEY",
        "PATENT_GUARD_ENDPOINT",
        "PATENT_GUARD_MODEL",
        "PATENT_GUARD_DEPLOYMENT",
        "PATENT_GUARD_TIMEOUT_SECS",
        "PATENT_GUARD_MAX_RETRIES",
        "PATENT_GUARD_API_VERSION",
        "PATENT_GUARD_DEBUG",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1");
    cmd.arg("--patents")
        .arg(dir.join("patents.json"))
        .arg("--companies")
        .arg(dir.join("company_products.json"));
    cmd
}
