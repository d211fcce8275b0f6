use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::api_connection::connection::Encoder;
use crate::search::error::SearchError;
use crate::search::ranker::{DomainRanker, Limit, RankParams};
use crate::search::response::Response;
use crate::search::vector::Float;

pub const DEFAULT_LOCALE: &str = "us";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Locale applied when a query does not name one.
    pub default_locale: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

/// One keyword search.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub text: String,
    pub locale: String,
    pub threshold: Float,
    pub limit: Limit,
}

impl Query {
    pub fn new(text: impl Into<String>, locale: impl Into<String>, threshold: Float, limit: Limit) -> Self {
        Self {
            text: text.into(),
            locale: locale.into(),
            threshold,
            limit,
        }
    }
}

/// Per-stage durations of one search, each measured with its own clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub encode: Duration,
    pub rank: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.encode + self.rank
    }
}

/// Encodes the query, ranks it against the active backend and wraps the
/// outcome in a [`Response`]. Failures become error codes on the response.
pub struct SearchEngine {
    encoder: Arc<dyn Encoder>,
    ranker: Arc<dyn DomainRanker>,
    config: EngineConfig,
}

impl SearchEngine {
    pub fn new(encoder: Arc<dyn Encoder>, ranker: Arc<dyn DomainRanker>, config: EngineConfig) -> Self {
        Self { encoder, ranker, config }
    }

    pub fn backend(&self) -> &'static str {
        self.ranker.backend()
    }

    pub async fn search(&self, query: &Query) -> Response {
        self.search_timed(query).await.0
    }

    pub async fn search_timed(&self, query: &Query) -> (Response, StageTimings) {
        let locale = if query.locale.is_empty() {
            self.config.default_locale.clone()
        } else {
            query.locale.clone()
        };
        let mut response = Response::new(&query.text, &locale);
        let mut timings = StageTimings::default();

        let encode_start = Instant::now();
        let encoded = self.encoder.encode(&query.text).await;
        timings.encode = encode_start.elapsed();

        let outcome = match encoded {
            Ok(vector) => {
                let params = RankParams {
                    locale,
                    threshold: query.threshold,
                    limit: query.limit,
                };
                let rank_start = Instant::now();
                let ranked = self.ranker.rank(&vector, &params);
                timings.rank = rank_start.elapsed();
                ranked
            }
            Err(e) => Err(SearchError::from(e)),
        };

        match outcome {
            Ok(domains) => {
                debug!(
                    keywords = %query.text,
                    backend = self.ranker.backend(),
                    results = domains.len(),
                    "Search complete"
                );
                response.dn = domains;
            }
            Err(e) => {
                warn!(keywords = %query.text, backend = self.ranker.backend(), error = %e, "Search failed");
                response.err = e.code().as_i32();
            }
        }

        response.set_elapsed(timings.total());
        (response, timings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_connection::connection::ApiConnectionError;
    use crate::search::corpus::{Corpus, DomainRecord};
    use crate::search::error::ErrorCode;
    use crate::search::ranker::LinearScanRanker;
    use async_trait::async_trait;

    enum FakeEncoder {
        Vector(Vec<Float>),
        Fail,
    }

    #[async_trait]
    impl Encoder for FakeEncoder {
        async fn encode(&self, _text: &str) -> Result<Vec<f32>, ApiConnectionError> {
            match self {
                FakeEncoder::Vector(v) => Ok(v.clone()),
                FakeEncoder::Fail => Err(ApiConnectionError::EmptyEmbeddings),
            }
        }
    }

    struct UnreachableStore;

    impl DomainRanker for UnreachableStore {
        fn backend(&self) -> &'static str {
            "fake"
        }

        fn rank(&self, _query: &[Float], _params: &RankParams) -> Result<Vec<String>, SearchError> {
            Err(SearchError::Connectivity("store is down".to_string()))
        }
    }

    fn vector_with_relevance(relevance: Float) -> Vec<Float> {
        let similarity = relevance * 2.0 - 1.0;
        vec![similarity, (1.0 - similarity * similarity).max(0.0).sqrt()]
    }

    fn scenario_ranker() -> Arc<dyn DomainRanker> {
        let corpus = Corpus::new(vec![
            DomainRecord::new("ford.com", "us", vector_with_relevance(0.91)).unwrap(),
            DomainRecord::new("napaonline.com", "us", vector_with_relevance(0.95)).unwrap(),
            DomainRecord::new("toyota.jp", "jp", vector_with_relevance(0.93)).unwrap(),
        ])
        .unwrap();
        Arc::new(LinearScanRanker::new(Arc::new(corpus)))
    }

    fn engine(encoder: FakeEncoder, ranker: Arc<dyn DomainRanker>) -> SearchEngine {
        SearchEngine::new(Arc::new(encoder), ranker, EngineConfig::default())
    }

    #[tokio::test]
    async fn test_search_success() {
        let engine = engine(FakeEncoder::Vector(vec![1.0, 0.0]), scenario_ranker());
        let response = engine.search(&Query::new("new truck", "us", 0.5, Limit::AtMost(3))).await;
        assert_eq!(response.kw, "new truck");
        assert_eq!(response.cn, "us");
        assert_eq!(response.dn, vec!["napaonline.com", "ford.com"]);
        assert_eq!(response.err, 0);
    }

    #[tokio::test]
    async fn test_no_matches_is_not_an_error() {
        let engine = engine(FakeEncoder::Vector(vec![1.0, 0.0]), scenario_ranker());
        let response = engine.search(&Query::new("new truck", "us", 0.99, Limit::AtMost(3))).await;
        assert!(response.dn.is_empty());
        assert_eq!(response.err, ErrorCode::Ok.as_i32());
    }

    #[tokio::test]
    async fn test_empty_locale_uses_configured_default() {
        let encoder: Arc<dyn Encoder> = Arc::new(FakeEncoder::Vector(vec![1.0, 0.0]));
        let engine = SearchEngine::new(
            encoder,
            scenario_ranker(),
            EngineConfig {
                default_locale: "jp".to_string(),
            },
        );
        let response = engine.search(&Query::new("cars", "", 0.5, Limit::Unbounded)).await;
        assert_eq!(response.cn, "jp");
        assert_eq!(response.dn, vec!["toyota.jp"]);
    }

    #[tokio::test]
    async fn test_encoder_failure_sets_code_one() {
        let engine = engine(FakeEncoder::Fail, scenario_ranker());
        let (response, timings) = engine
            .search_timed(&Query::new("new truck", "us", 0.5, Limit::AtMost(3)))
            .await;
        assert!(response.dn.is_empty());
        assert_eq!(response.err, ErrorCode::Encoding.as_i32());
        assert_eq!(timings.rank, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_store_failure_returns_empty_domains() {
        let engine = engine(FakeEncoder::Vector(vec![1.0, 0.0]), Arc::new(UnreachableStore));
        let response = engine.search(&Query::new("new truck", "us", 0.5, Limit::AtMost(3))).await;
        assert!(response.dn.is_empty());
        assert_eq!(response.err, ErrorCode::Connectivity.as_i32());
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch_sets_shape_code() {
        let engine = engine(FakeEncoder::Vector(vec![1.0, 0.0, 0.0]), scenario_ranker());
        let response = engine.search(&Query::new("new truck", "us", 0.5, Limit::AtMost(3))).await;
        assert!(response.dn.is_empty());
        assert_eq!(response.err, ErrorCode::ShapeMismatch.as_i32());
    }

    #[tokio::test]
    async fn test_elapsed_is_sum_of_stages() {
        let engine = engine(FakeEncoder::Vector(vec![1.0, 0.0]), scenario_ranker());
        let (response, timings) = engine
            .search_timed(&Query::new("new truck", "us", 0.5, Limit::AtMost(3)))
            .await;
        assert_eq!(response.ms, timings.total().as_millis() as u64);
        assert_eq!(timings.total(), timings.encode + timings.rank);
    }

    #[tokio::test]
    async fn test_repeated_search_is_identical() {
        let engine = engine(FakeEncoder::Vector(vec![0.8, 0.6]), scenario_ranker());
        let query = Query::new("auto parts", "", 0.0, Limit::Unbounded);
        let first = engine.search(&query).await;
        let second = engine.search(&query).await;
        assert_eq!(first.dn, second.dn);
        assert_eq!(first.dn.len(), 2);
    }
}
