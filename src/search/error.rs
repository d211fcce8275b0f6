use thiserror::Error;

use crate::api_connection::connection::ApiConnectionError;
use crate::search::vector::ShapeError;

/// Stable numeric codes reported in the `err` field of a response.
///
/// | code | meaning |
/// |------|---------|
/// | 0 | success (including "no matches") |
/// | 1 | query text could not be encoded |
/// | 2 | corpus store could not be opened |
/// | 3 | corpus store did not answer a ping |
/// | 4 | neighbour query could not be prepared or executed |
/// | 5 | a result row could not be decoded |
/// | 6 | iterating the result rows failed |
/// | 7 | query and corpus embeddings differ in length |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Ok = 0,
    Encoding = 1,
    CorpusUnavailable = 2,
    Connectivity = 3,
    Query = 4,
    Decode = 5,
    RowIteration = 6,
    ShapeMismatch = 7,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Failures a single search can hit. The engine turns these into an error
/// code; they never escape it.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Failed to encode keywords: {0}")]
    Encoding(#[from] ApiConnectionError),

    #[error("Corpus unavailable: {0}")]
    CorpusUnavailable(String),

    #[error("Failed to reach corpus store: {0}")]
    Connectivity(String),

    #[error("Failed to execute neighbour query: {0}")]
    Query(String),

    #[error("Failed to decode result row: {0}")]
    Decode(String),

    #[error("Error iterating result rows: {0}")]
    RowIteration(String),

    #[error(transparent)]
    ShapeMismatch(#[from] ShapeError),
}

impl SearchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SearchError::Encoding(_) => ErrorCode::Encoding,
            SearchError::CorpusUnavailable(_) => ErrorCode::CorpusUnavailable,
            SearchError::Connectivity(_) => ErrorCode::Connectivity,
            SearchError::Query(_) => ErrorCode::Query,
            SearchError::Decode(_) => ErrorCode::Decode,
            SearchError::RowIteration(_) => ErrorCode::RowIteration,
            SearchError::ShapeMismatch(_) => ErrorCode::ShapeMismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorCode::Ok.as_i32(), 0);
        assert_eq!(SearchError::Encoding(ApiConnectionError::EmptyEmbeddings).code().as_i32(), 1);
        assert_eq!(SearchError::CorpusUnavailable("x".into()).code().as_i32(), 2);
        assert_eq!(SearchError::Connectivity("x".into()).code().as_i32(), 3);
        assert_eq!(SearchError::Query("x".into()).code().as_i32(), 4);
        assert_eq!(SearchError::Decode("x".into()).code().as_i32(), 5);
        assert_eq!(SearchError::RowIteration("x".into()).code().as_i32(), 6);
        let shape = ShapeError { expected: 3, actual: 2 };
        assert_eq!(SearchError::from(shape).code().as_i32(), 7);
    }
}
