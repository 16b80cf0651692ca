use std::collections::HashSet;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod archive;
pub mod file_store;

/// One numbered claim of a patent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub number: String,
    pub text: String,
}

impl Claim {
    pub fn new(number: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            text: text.into(),
        }
    }
}

/// Bibliographic data carried alongside a patent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatentMetadata {
    pub assignee: Option<String>,
    pub inventors: Vec<String>,
    pub priority_date: Option<NaiveDate>,
    pub application_date: Option<NaiveDate>,
    pub grant_date: Option<NaiveDate>,
    pub jurisdictions: Option<String>,
    pub classifications: Vec<String>,
}

/// Imported patent record. Claims keep the order they were imported in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patent {
    pub publication_number: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub description: String,
    pub claims: Vec<Claim>,
    pub metadata: PatentMetadata,
}

impl Patent {
    /// Construct a patent, validating invariants before returning.
    pub fn new(
        publication_number: impl Into<String>,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
        claims: Vec<Claim>,
    ) -> Result<Self, RecordValidationError> {
        let patent = Self {
            publication_number: publication_number.into(),
            title: title.into(),
            abstract_text: abstract_text.into(),
            description: String::new(),
            claims,
            metadata: PatentMetadata::default(),
        };
        patent.validate()?;
        Ok(patent)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_metadata(mut self, metadata: PatentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.publication_number.trim().is_empty() {
            return Err(RecordValidationError::BlankPublicationNumber);
        }
        if self.title.trim().is_empty() {
            return Err(RecordValidationError::BlankTitle {
                publication_number: self.publication_number.clone(),
            });
        }
        let mut seen = HashSet::new();
        for claim in &self.claims {
            if !seen.insert(claim.number.as_str()) {
                return Err(RecordValidationError::DuplicateClaimNumber {
                    publication_number: self.publication_number.clone(),
                    number: claim.number.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A product as described by its maker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub description: String,
}

impl Product {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub products: Vec<Product>,
}

impl Company {
    pub fn new(
        name: impl Into<String>,
        products: Vec<Product>,
    ) -> Result<Self, RecordValidationError> {
        let company = Self {
            name: name.into(),
            products,
        };
        company.validate()?;
        Ok(company)
    }

    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.name.trim().is_empty() {
            return Err(RecordValidationError::BlankCompanyName);
        }
        if self.products.iter().any(|p| p.name.trim().is_empty()) {
            return Err(RecordValidationError::BlankProductName {
                company: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// Errors emitted while validating imported records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    #[error("patent publication number must not be blank")]
    BlankPublicationNumber,
    #[error("patent `{publication_number}` title must not be blank")]
    BlankTitle { publication_number: String },
    #[error("patent `{publication_number}` has duplicate claim number `{number}`")]
    DuplicateClaimNumber {
        publication_number: String,
        number: String,
    },
    #[error("company name must not be blank")]
    BlankCompanyName,
    #[error("company `{company}` has a product with a blank name")]
    BlankProductName { company: String },
    #[error("duplicate patent `{0}`")]
    DuplicatePatent(String),
    #[error("duplicate company `{0}`")]
    DuplicateCompany(String),
}

/// Read-only lookup over imported patents and companies.
#[async_trait]
pub trait PatentStore: Send + Sync {
    /// Fetch a patent by its publication number.
    async fn find_patent(&self, publication_number: &str) -> AnyResult<Option<Patent>>;

    /// Fetch a company by exact name.
    async fn find_company(&self, name: &str) -> AnyResult<Option<Company>>;

    /// Publication numbers of every stored patent.
    async fn list_patents(&self) -> AnyResult<Vec<String>>;

    /// Names of every stored company.
    async fn list_companies(&self) -> AnyResult<Vec<String>>;
}

/// Store kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    patents: Vec<Patent>,
    companies: Vec<Company>,
}

impl InMemoryStore {
    pub fn new(
        patents: Vec<Patent>,
        companies: Vec<Company>,
    ) -> Result<Self, RecordValidationError> {
        let mut numbers = HashSet::new();
        for patent in &patents {
            patent.validate()?;
            if !numbers.insert(patent.publication_number.as_str()) {
                return Err(RecordValidationError::DuplicatePatent(
                    patent.publication_number.clone(),
                ));
            }
        }
        let mut names = HashSet::new();
        for company in &companies {
            company.validate()?;
            if !names.insert(company.name.as_str()) {
                return Err(RecordValidationError::DuplicateCompany(company.name.clone()));
            }
        }
        Ok(Self { patents, companies })
    }
}

#[async_trait]
impl PatentStore for InMemoryStore {
    async fn find_patent(&self, publication_number: &str) -> AnyResult<Option<Patent>> {
        let wanted = publication_number.trim();
        Ok(self
            .patents
            .iter()
            .find(|p| p.publication_number == wanted)
            .cloned())
    }

    async fn find_company(&self, name: &str) -> AnyResult<Option<Company>> {
        let wanted = name.trim();
        Ok(self.companies.iter().find(|c| c.name == wanted).cloned())
    }

    async fn list_patents(&self) -> AnyResult<Vec<String>> {
        Ok(self
            .patents
            .iter()
            .map(|p| p.publication_number.clone())
            .collect())
    }

    async fn list_companies(&self) -> AnyResult<Vec<String>> {
        Ok(self.companies.iter().map(|c| c.name.clone()).collect())
    }
}
