//! Delegated backend: nearest-neighbour search pushed into a `sqlite-vec`
//! `vec0` table.
//!
//! The store returns up to `k` rows of `(domain, country, distance)` already
//! ordered by ascending cosine distance. Only the threshold, locale filter and
//! limit are applied here; the store's order is never re-ranked.

use rusqlite::{ffi, params, Connection, LoadExtensionGuard, OpenFlags, Row};
use std::path::PathBuf;
use std::sync::Once;
use std::time::Duration;
use tracing::{debug, info};

use crate::search::error::SearchError;
use crate::search::ranker::{select_domains, DomainRanker, Limit, Match, RankParams};
use crate::search::vector::Float;

pub const DEFAULT_NEIGHBORS: usize = 10;

const NEIGHBOR_QUERY: &str = "
    SELECT d.domain, d.country, d.distance
    FROM domains AS d
    WHERE d.embedding MATCH ?1
    AND k = ?2
    ORDER BY d.distance
";

static REGISTER_VEC: Once = Once::new();

/// Registers the statically linked sqlite-vec extension with every
/// connection opened afterwards in this process.
pub fn register_sqlite_vec() {
    REGISTER_VEC.call_once(|| {
        // SAFETY: `sqlite3_vec_init` is the extension entry point sqlite
        // expects; the pointer cast only erases its signature for the
        // auto-extension registry.
        unsafe {
            ffi::sqlite3_auto_extension(Some(std::mem::transmute(sqlite_vec::sqlite3_vec_init as *const ())));
        }
    });
}

/// Query vector as the little-endian `f32` blob vec0 expects.
fn vector_blob(query: &[Float]) -> Vec<u8> {
    query.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqliteStoreConfig {
    pub path: PathBuf,
    /// Base neighbour count requested from the index.
    pub neighbors: usize,
    pub busy_timeout: Duration,
    /// Loadable sqlite-vec library to use instead of the linked-in build.
    pub vec_extension: Option<PathBuf>,
}

impl SqliteStoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            neighbors: DEFAULT_NEIGHBORS,
            busy_timeout: Duration::from_secs(5),
            vec_extension: None,
        }
    }
}

pub struct SqliteVecRanker {
    config: SqliteStoreConfig,
}

impl SqliteVecRanker {
    pub fn new(config: SqliteStoreConfig) -> Self {
        if config.vec_extension.is_none() {
            register_sqlite_vec();
        }
        Self { config }
    }

    /// Neighbour count for a query. A bounded limit larger than the configured
    /// count raises k so the index never caps the result below the request.
    pub fn neighbor_count(&self, limit: Limit) -> usize {
        match limit {
            Limit::AtMost(max) => self.config.neighbors.max(max),
            Limit::Unbounded => self.config.neighbors,
        }
    }

    fn open(&self) -> Result<Connection, SearchError> {
        let conn = Connection::open_with_flags(
            &self.config.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| SearchError::CorpusUnavailable(format!("failed to open {:?}: {}", self.config.path, e)))?;

        conn.busy_timeout(self.config.busy_timeout)
            .map_err(|e| SearchError::CorpusUnavailable(e.to_string()))?;

        if let Some(extension) = &self.config.vec_extension {
            // SAFETY: the extension path comes from operator configuration and
            // loading is disabled again when the guard drops.
            unsafe {
                let _guard = LoadExtensionGuard::new(&conn)
                    .map_err(|e| SearchError::CorpusUnavailable(e.to_string()))?;
                conn.load_extension(extension, None).map_err(|e| {
                    SearchError::CorpusUnavailable(format!("failed to load extension {:?}: {}", extension, e))
                })?;
            }
        }
        Ok(conn)
    }

    fn ping(conn: &Connection) -> Result<(), SearchError> {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|e| SearchError::Connectivity(e.to_string()))
    }

    /// Startup health check. Returns the sqlite-vec version string.
    pub fn probe(&self) -> Result<String, SearchError> {
        let conn = self.open()?;
        Self::ping(&conn)?;
        let version: String = conn
            .query_row("SELECT vec_version()", [], |row| row.get(0))
            .map_err(|e| SearchError::CorpusUnavailable(format!("sqlite-vec extension not available: {}", e)))?;
        info!(path = %self.config.path.display(), vec_version = %version, "Opened sqlite-vec corpus store");
        Ok(version)
    }

    fn fetch_neighbors(&self, conn: &Connection, query: &[Float], k: usize) -> Result<Vec<Match>, SearchError> {
        let blob = vector_blob(query);

        let mut stmt = conn
            .prepare(NEIGHBOR_QUERY)
            .map_err(|e| SearchError::Query(e.to_string()))?;
        let mut rows = stmt
            .query(params![blob, k as i64])
            .map_err(|e| SearchError::Query(e.to_string()))?;

        let mut neighbors = Vec::with_capacity(k);
        while let Some(row) = rows.next().map_err(|e| SearchError::RowIteration(e.to_string()))? {
            neighbors.push(neighbor_from_row(row)?);
        }
        Ok(neighbors)
    }
}

/// Decodes one `(domain, country, distance)` row.
pub(crate) fn neighbor_from_row(row: &Row<'_>) -> Result<Match, SearchError> {
    let decode = |e: rusqlite::Error| SearchError::Decode(e.to_string());
    let domain: String = row.get(0).map_err(decode)?;
    let locale: String = row.get(1).map_err(decode)?;
    let distance: f64 = row.get(2).map_err(decode)?;
    let distance = distance as Float;
    Ok(Match {
        domain,
        locale,
        similarity: 1.0 - distance,
        distance,
    })
}

impl DomainRanker for SqliteVecRanker {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn rank(&self, query: &[Float], params: &RankParams) -> Result<Vec<String>, SearchError> {
        let k = self.neighbor_count(params.limit);
        if params.limit == Limit::Unbounded {
            debug!(k, "Unbounded limit on the sqlite backend; results are capped at k neighbours");
        }

        let conn = self.open()?;
        Self::ping(&conn)?;
        let neighbors = self.fetch_neighbors(&conn, query, k)?;
        debug!(k, returned = neighbors.len(), "Fetched neighbours from sqlite-vec");
        Ok(select_domains(neighbors, params))
    }
}
