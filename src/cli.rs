use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::api_connection::endpoints::{DEFAULT_EMBEDDING_MODEL, DEFAULT_OLLAMA_URL};
use crate::search::engine::DEFAULT_LOCALE;
use crate::search::sqlite_store::DEFAULT_NEIGHBORS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Pick from the corpus file extension
    Auto,
    /// Delimited text table scanned in memory
    Csv,
    /// sqlite-vec indexed store
    Sqlite,
}

impl Backend {
    /// `.sqlite`, `.sqlite3` and `.db` select the sqlite backend; anything else is csv.
    pub fn resolve(self, corpus_path: &Path) -> Backend {
        match self {
            Backend::Auto => {
                let ext = corpus_path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_ascii_lowercase());
                match ext.as_deref() {
                    Some("sqlite") | Some("sqlite3") | Some("db") => Backend::Sqlite,
                    _ => Backend::Csv,
                }
            }
            explicit => explicit,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Match free-text keywords to relevant domain names", long_about = None)]
pub struct Cli {
    /// Keywords for a single search. Reads one query per line from stdin when omitted
    pub keywords: Vec<String>,

    /// Path to the corpus (CSV with embeddings, or a sqlite-vec database)
    #[arg(long, env = "DOMAIN_MATCH_DB", default_value = "./reference/rc_domains_embeds.csv")]
    pub db: PathBuf,

    /// Corpus backend
    #[arg(long, value_enum, env = "DOMAIN_MATCH_BACKEND", default_value_t = Backend::Auto)]
    pub backend: Backend,

    /// Ollama server URL
    #[arg(long, env = "DOMAIN_MATCH_OLLAMA", default_value = DEFAULT_OLLAMA_URL)]
    pub ollama: String,

    /// Model name for embeddings
    #[arg(long, env = "DOMAIN_MATCH_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub model: String,

    /// Country code for filtering results
    #[arg(long, env = "DOMAIN_MATCH_COUNTRY", default_value = DEFAULT_LOCALE)]
    pub country: String,

    /// Country used when a query's country is empty
    #[arg(long, env = "DOMAIN_MATCH_DEFAULT_COUNTRY", default_value = DEFAULT_LOCALE)]
    pub default_country: String,

    /// Similarity threshold (0.0-1.0)
    #[arg(long, env = "DOMAIN_MATCH_THRESHOLD", default_value_t = 0.5)]
    pub threshold: f32,

    /// Maximum number of results to return (0 or negative for no limit)
    #[arg(long, env = "DOMAIN_MATCH_LIMIT", default_value_t = 3, allow_negative_numbers = true)]
    pub limit: i64,

    /// Expected embedding length; inferred from the first CSV row when omitted
    #[arg(long, env = "DOMAIN_MATCH_DIMENSION")]
    pub dimension: Option<usize>,

    /// Neighbour count requested from the sqlite-vec index
    #[arg(long, env = "DOMAIN_MATCH_NEIGHBORS", default_value_t = DEFAULT_NEIGHBORS)]
    pub neighbors: usize,

    /// sqlite-vec loadable extension to use instead of the linked-in one
    #[arg(long, env = "DOMAIN_MATCH_VEC_EXTENSION")]
    pub vec_extension: Option<PathBuf>,

    /// Timeout in seconds for the encoder request and sqlite busy waits
    #[arg(long, env = "DOMAIN_MATCH_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Log encoding and ranking time for every query
    #[arg(long)]
    pub timings: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Positional arguments joined into one keyword string.
    pub fn joined_keywords(&self) -> Option<String> {
        let joined = self.keywords.join(" ");
        if joined.trim().is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Diagnostics go to stderr so stdout stays one JSON line per query.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
