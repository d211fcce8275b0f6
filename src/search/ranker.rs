use rayon::prelude::*;
use std::sync::Arc;

use crate::search::corpus::Corpus;
use crate::search::error::SearchError;
use crate::search::vector::{cosine_similarity, distance, normalized_relevance, Float};

/// Maximum number of domains a query may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Unbounded,
    AtMost(usize),
}

impl Limit {
    /// Zero and negative values mean "no limit".
    pub fn from_raw(raw: i64) -> Self {
        if raw <= 0 {
            Limit::Unbounded
        } else {
            Limit::AtMost(usize::try_from(raw).unwrap_or(usize::MAX))
        }
    }

    pub fn reached(&self, count: usize) -> bool {
        matches!(self, Limit::AtMost(max) if count >= *max)
    }
}

/// Filters applied to an already-ranked candidate list.
#[derive(Debug, Clone, PartialEq)]
pub struct RankParams {
    /// Exact-match locale; empty accepts every locale.
    pub locale: String,
    /// Minimum relevance on the [0, 1] scale. Not clamped.
    pub threshold: Float,
    pub limit: Limit,
}

/// A scored candidate, ordered by ascending distance.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub domain: String,
    pub locale: String,
    pub similarity: Float,
    pub distance: Float,
}

impl Match {
    pub fn relevance(&self) -> Float {
        normalized_relevance(self.similarity)
    }
}

/// Walks candidates in rank order and keeps those passing the threshold and
/// locale filter, stopping once the limit is reached.
pub fn select_domains<I>(candidates: I, params: &RankParams) -> Vec<String>
where
    I: IntoIterator<Item = Match>,
{
    let mut domains = Vec::new();
    for candidate in candidates {
        if params.limit.reached(domains.len()) {
            break;
        }
        // NaN relevance never passes.
        if !(candidate.relevance() >= params.threshold) {
            continue;
        }
        if !params.locale.is_empty() && candidate.locale != params.locale {
            continue;
        }
        domains.push(candidate.domain);
    }
    domains
}

/// Capability shared by every corpus backend: rank domains for a query vector.
pub trait DomainRanker: Send + Sync {
    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;

    fn rank(&self, query: &[Float], params: &RankParams) -> Result<Vec<String>, SearchError>;
}

/// Full linear scan over an in-memory corpus.
pub struct LinearScanRanker {
    corpus: Arc<Corpus>,
}

impl LinearScanRanker {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self { corpus }
    }

    /// Scores every record and returns them by ascending distance. Equal
    /// distances keep corpus order.
    pub fn score_all(&self, query: &[Float]) -> Result<Vec<Match>, SearchError> {
        if self.corpus.is_empty() {
            return Ok(Vec::new());
        }

        // The collect keeps corpus order, which the stable sort below relies on.
        let mut matches = self
            .corpus
            .records()
            .par_iter()
            .map(|record| -> Result<Match, SearchError> {
                let similarity = cosine_similarity(query, record.embedding())?;
                Ok(Match {
                    domain: record.domain().to_string(),
                    locale: record.locale().to_string(),
                    similarity,
                    distance: distance(similarity),
                })
            })
            .collect::<Result<Vec<Match>, SearchError>>()?;

        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(matches)
    }
}

impl DomainRanker for LinearScanRanker {
    fn backend(&self) -> &'static str {
        "csv"
    }

    fn rank(&self, query: &[Float], params: &RankParams) -> Result<Vec<String>, SearchError> {
        let matches = self.score_all(query)?;
        Ok(select_domains(matches, params))
    }
}
