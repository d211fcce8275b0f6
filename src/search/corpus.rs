use anyhow::{anyhow, Result};

use crate::search::vector::Float;

/// One domain and its precomputed embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainRecord {
    domain: String,
    locale: String,
    embedding: Vec<Float>,
}

impl DomainRecord {
    pub fn new(domain: impl Into<String>, locale: impl Into<String>, embedding: Vec<Float>) -> Result<Self> {
        let domain = domain.into();
        if domain.trim().is_empty() {
            return Err(anyhow!("Domain identifier must not be empty"));
        }
        Ok(Self {
            domain,
            locale: locale.into(),
            embedding,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn embedding(&self) -> &[Float] {
        &self.embedding
    }
}

/// Ordered, read-only set of domain records sharing one embedding dimension.
///
/// Built once by a loader and then shared across queries (typically behind an
/// `Arc`). Duplicate domains are kept and scored independently.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    records: Vec<DomainRecord>,
    dimension: usize,
}

impl Corpus {
    pub fn new(records: Vec<DomainRecord>) -> Result<Self> {
        let dimension = records.first().map_or(0, |r| r.embedding.len());
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != dimension) {
            return Err(anyhow!(
                "Embedding dimension mismatch for domain '{}'. Expected {}, got {}.",
                bad.domain,
                dimension,
                bad.embedding.len()
            ));
        }
        Ok(Self { records, dimension })
    }

    /// Embedding length shared by every record, 0 for an empty corpus.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DomainRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DomainRecord> {
        self.records.iter()
    }
}
