use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use serde::{de::DeserializeOwned, de::Error as _, Deserialize, Deserializer};
use serde_json::Value;

use super::{Claim, Company, InMemoryStore, Patent, PatentMetadata, PatentStore, Product};

/// Loads patents and companies from the JSON import files.
///
/// `patents.json` holds an array of patent records; `company_products.json`
/// holds `{ "companies": [...] }`. Both files are read once on first lookup.
pub struct JsonFileStore {
    patents_path: PathBuf,
    companies_path: PathBuf,
    cache: OnceCell<InMemoryStore>,
}

impl JsonFileStore {
    pub fn new(patents_path: impl Into<PathBuf>, companies_path: impl Into<PathBuf>) -> Self {
        Self {
            patents_path: patents_path.into(),
            companies_path: companies_path.into(),
            cache: OnceCell::new(),
        }
    }

    fn load_patents(&self) -> Result<Vec<Patent>> {
        let path = &self.patents_path;
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read patents file at {}", path.display()))?;
        let records: Vec<PatentRecord> = serde_json::from_str(&content)
            .with_context(|| format!("invalid patents JSON in {}", path.display()))?;
        records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| {
                record.into_patent().with_context(|| {
                    format!("invalid patent record #{} in {}", idx + 1, path.display())
                })
            })
            .collect()
    }

    fn load_companies(&self) -> Result<Vec<Company>> {
        let path = &self.companies_path;
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read companies file at {}", path.display()))?;
        let file: CompaniesFile = serde_json::from_str(&content)
            .with_context(|| format!("invalid companies JSON in {}", path.display()))?;
        file.companies
            .into_iter()
            .map(|record| {
                let name = record.name.clone();
                let products = record
                    .products
                    .into_iter()
                    .map(|p| Product::new(p.name.trim(), p.description))
                    .collect();
                Company::new(record.name.trim(), products)
                    .with_context(|| format!("invalid company `{name}` in {}", path.display()))
            })
            .collect()
    }

    fn store(&self) -> Result<&InMemoryStore> {
        self.cache.get_or_try_init(|| {
            let patents = self.load_patents()?;
            let companies = self.load_companies()?;
            tracing::debug!(
                patents = patents.len(),
                companies = companies.len(),
                "loaded import files"
            );
            InMemoryStore::new(patents, companies).context("import files contain duplicate records")
        })
    }
}

#[async_trait::async_trait]
impl PatentStore for JsonFileStore {
    async fn find_patent(&self, publication_number: &str) -> Result<Option<Patent>> {
        self.store()?.find_patent(publication_number).await
    }

    async fn find_company(&self, name: &str) -> Result<Option<Company>> {
        self.store()?.find_company(name).await
    }

    async fn list_patents(&self) -> Result<Vec<String>> {
        self.store()?.list_patents().await
    }

    async fn list_companies(&self) -> Result<Vec<String>> {
        self.store()?.list_companies().await
    }
}

#[derive(Deserialize)]
struct PatentRecord {
    publication_number: String,
    title: String,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    assignee: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    inventors: Vec<Value>,
    #[serde(default)]
    priority_date: Option<String>,
    #[serde(default)]
    application_date: Option<String>,
    #[serde(default)]
    grant_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    claims: Vec<ClaimRecord>,
    #[serde(default)]
    jurisdictions: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    classifications: Vec<Value>,
}

impl PatentRecord {
    fn into_patent(self) -> Result<Patent> {
        let claims = self
            .claims
            .into_iter()
            .map(|c| Claim::new(value_label(&c.num, "num"), c.text))
            .collect();
        let metadata = PatentMetadata {
            assignee: self.assignee.filter(|v| !v.trim().is_empty()),
            inventors: self.inventors.iter().map(|v| value_label(v, "name")).collect(),
            priority_date: parse_date(self.priority_date.as_deref()),
            application_date: parse_date(self.application_date.as_deref()),
            grant_date: parse_date(self.grant_date.as_deref()),
            jurisdictions: self.jurisdictions.filter(|v| !v.trim().is_empty()),
            classifications: self
                .classifications
                .iter()
                .map(|v| value_label(v, "code"))
                .collect(),
        };
        let patent = Patent::new(
            self.publication_number.trim(),
            self.title,
            self.abstract_text.unwrap_or_default(),
            claims,
        )?
        .with_description(self.description.unwrap_or_default())
        .with_metadata(metadata);
        Ok(patent)
    }
}

#[derive(Deserialize)]
struct ClaimRecord {
    num: Value,
    text: String,
}

#[derive(Deserialize)]
struct CompaniesFile {
    companies: Vec<CompanyRecord>,
}

#[derive(Deserialize)]
struct CompanyRecord {
    name: String,
    #[serde(default)]
    products: Vec<ProductRecord>,
}

#[derive(Deserialize)]
struct ProductRecord {
    name: String,
    #[serde(default)]
    description: String,
}

/// Accept a list as a JSON array, a JSON-encoded string holding an array,
/// or `null`. Blank strings and `null` become an empty list.
fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(encoded) if encoded.trim().is_empty() => Ok(Vec::new()),
        Value::String(encoded) => serde_json::from_str(&encoded).map_err(D::Error::custom),
        other @ Value::Array(_) => serde_json::from_value(other).map_err(D::Error::custom),
        other => Err(D::Error::custom(format!(
            "expected an array or a JSON-encoded array, found {other}"
        ))),
    }
}

/// Parse `YYYY-MM-DD`; anything else is treated as unknown.
fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Render loosely typed JSON values (string, number or object) as a label.
fn value_label(value: &Value, key: &str) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => map
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}
