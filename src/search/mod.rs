pub mod corpus;
pub mod data_loader;
pub mod engine;
pub mod error;
pub mod ranker;
pub mod response;
pub mod sqlite_store;
pub mod vector;

pub use corpus::{Corpus, DomainRecord};
pub use data_loader::{load_corpus_from_csv, load_corpus_from_reader, LoadReport};
pub use engine::{EngineConfig, Query, SearchEngine, StageTimings};
pub use error::{ErrorCode, SearchError};
pub use ranker::{DomainRanker, LinearScanRanker, Limit, RankParams};
pub use response::Response;
pub use sqlite_store::{SqliteStoreConfig, SqliteVecRanker};
