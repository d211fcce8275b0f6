use anyhow::{anyhow, Context, Result};
use domain_match::api_connection::{EncoderConfig, OllamaClient};
use domain_match::cli::{init_logging, parse_args, Backend, Cli};
use domain_match::search::{
    load_corpus_from_csv, DomainRanker, EngineConfig, Limit, LinearScanRanker, Query, SearchEngine,
    SqliteStoreConfig, SqliteVecRanker,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

fn build_ranker(cli: &Cli) -> Result<Arc<dyn DomainRanker>> {
    match cli.backend.resolve(&cli.db) {
        Backend::Sqlite => {
            let config = SqliteStoreConfig {
                path: cli.db.clone(),
                neighbors: cli.neighbors,
                busy_timeout: Duration::from_secs(cli.timeout_secs),
                vec_extension: cli.vec_extension.clone(),
            };
            let ranker = SqliteVecRanker::new(config);
            ranker
                .probe()
                .with_context(|| format!("Failed to open sqlite-vec store at {:?}", cli.db))?;
            if Limit::from_raw(cli.limit) == Limit::Unbounded {
                warn!(k = cli.neighbors, "No result limit set; the sqlite backend caps results at k neighbours");
            }
            Ok(Arc::new(ranker))
        }
        // Auto always resolves to a concrete backend.
        Backend::Csv | Backend::Auto => {
            let (corpus, _report) = load_corpus_from_csv(&cli.db, cli.dimension)
                .with_context(|| format!("Error loading embeddings from {:?}", cli.db))?;
            Ok(Arc::new(LinearScanRanker::new(Arc::new(corpus))))
        }
    }
}

async fn run_query(engine: &SearchEngine, cli: &Cli, keywords: &str, log_timings: bool) -> Result<bool> {
    let query = Query::new(keywords, cli.country.clone(), cli.threshold, Limit::from_raw(cli.limit));
    let (response, timings) = engine.search_timed(&query).await;

    if log_timings {
        info!(
            keywords,
            encode_ms = timings.encode.as_millis() as u64,
            rank_ms = timings.rank.as_millis() as u64,
            total_ms = timings.total().as_millis() as u64,
            results = response.dn.len(),
            "Query timings"
        );
    }

    let line = response.to_json_line().context("Error marshaling JSON")?;
    println!("{}", line);
    Ok(response.is_success())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = parse_args();
    init_logging(cli.verbose);

    // Load the corpus once at startup; it is reused for every search.
    let ranker = build_ranker(&cli)?;

    let encoder = OllamaClient::new(EncoderConfig {
        endpoint: cli.ollama.clone(),
        model: cli.model.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
    })
    .context("Failed to build encoder client")?;
    info!(url = encoder.url(), model = encoder.model(), "Using embedding endpoint");

    let engine = SearchEngine::new(
        Arc::new(encoder),
        ranker,
        EngineConfig {
            default_locale: cli.default_country.clone(),
        },
    );
    info!(backend = engine.backend(), "Search engine ready");

    if let Some(keywords) = cli.joined_keywords() {
        if !run_query(&engine, &cli, &keywords, cli.timings).await? {
            return Err(anyhow!("Search for '{}' failed", keywords));
        }
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Error reading from stdin")? {
        let keywords = line.trim();
        if keywords.is_empty() {
            continue;
        }
        if !run_query(&engine, &cli, keywords, cli.timings).await? {
            warn!(keywords, "Search failed; continuing with next line");
        }
    }

    Ok(())
}
