use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::search::corpus::{Corpus, DomainRecord};
use crate::search::vector::Float;

// Column layout: index, domain, locale, embedding
const DOMAIN_COL: usize = 1;
const LOCALE_COL: usize = 2;
const EMBEDDING_COL: usize = 3;
const MIN_COLUMNS: usize = 4;
const DOMAIN_HEADER: &str = "domain";

/// Summary of a tabular load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
    pub dimension: usize,
}

/// Parses an embedding cell such as `[-3.1e-02  4.3e-02 ...]`.
pub fn parse_embedding(cell: &str) -> Result<Vec<Float>> {
    let trimmed = cell.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| anyhow!("Embedding is not enclosed in brackets"))?;

    let values = inner
        .split_whitespace()
        .map(|token| {
            let value = token
                .parse::<Float>()
                .with_context(|| format!("Invalid embedding value '{}'", token))?;
            if !value.is_finite() {
                return Err(anyhow!("Non-finite embedding value '{}'", token));
            }
            Ok(value)
        })
        .collect::<Result<Vec<Float>>>()?;

    if values.is_empty() {
        return Err(anyhow!("Embedding is empty"));
    }
    Ok(values)
}

fn is_header(record: &StringRecord) -> bool {
    let first_empty = record.get(0).map_or(true, |s| s.trim().is_empty());
    let second_is_domain = record.get(DOMAIN_COL).map_or(false, |s| s.trim() == DOMAIN_HEADER);
    first_empty || second_is_domain
}

fn parse_row(record: &StringRecord, expected_dimension: Option<usize>) -> Result<DomainRecord> {
    if record.len() < MIN_COLUMNS {
        return Err(anyhow!("Expected at least {} columns, got {}", MIN_COLUMNS, record.len()));
    }
    let domain = record.get(DOMAIN_COL).unwrap_or_default().trim();
    let locale = record.get(LOCALE_COL).unwrap_or_default().trim();
    let embedding = parse_embedding(record.get(EMBEDDING_COL).unwrap_or_default())?;

    if let Some(dim) = expected_dimension {
        if embedding.len() != dim {
            return Err(anyhow!(
                "Embedding for '{}' has {} values, expected {}",
                domain,
                embedding.len(),
                dim
            ));
        }
    }
    DomainRecord::new(domain, locale, embedding)
}

/// Builds a corpus from any delimited source. Malformed rows are dropped with
/// a warning; only I/O failures abort the load.
///
/// When `expected_dimension` is `None` the first row that parses fixes it.
pub fn load_corpus_from_reader<R: Read>(reader: R, expected_dimension: Option<usize>) -> Result<(Corpus, LoadReport)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut dimension = expected_dimension;
    let mut records = Vec::new();
    let mut skipped = 0;

    for (row_index, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => {
                return Err(e).with_context(|| format!("Failed to read corpus row {}", row_index));
            }
            Err(e) => {
                warn!(row = row_index, error = %e, "Skipping unreadable corpus row");
                skipped += 1;
                continue;
            }
        };

        if row_index == 0 && is_header(&record) {
            debug!("Skipping corpus header row");
            continue;
        }

        match parse_row(&record, dimension) {
            Ok(domain_record) => {
                dimension.get_or_insert(domain_record.embedding().len());
                records.push(domain_record);
            }
            Err(e) => {
                warn!(row = row_index, error = %e, "Skipping malformed corpus row");
                skipped += 1;
            }
        }
    }

    let corpus = Corpus::new(records)?;
    let report = LoadReport {
        loaded: corpus.len(),
        skipped,
        dimension: corpus.dimension(),
    };
    Ok((corpus, report))
}

pub fn load_corpus_from_csv(csv_path: &Path, expected_dimension: Option<usize>) -> Result<(Corpus, LoadReport)> {
    if !csv_path.exists() {
        return Err(anyhow!("Corpus file not found at: {:?}", csv_path));
    }

    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open corpus file at {:?}", csv_path))?;
    let (corpus, report) = load_corpus_from_reader(file, expected_dimension)
        .with_context(|| format!("Failed to load corpus from {:?}", csv_path))?;

    info!(
        path = %csv_path.display(),
        loaded = report.loaded,
        skipped = report.skipped,
        dimension = report.dimension,
        "Loaded domain corpus"
    );
    if corpus.is_empty() {
        warn!(path = %csv_path.display(), "Corpus is empty; every search will return no domains");
    }
    Ok((corpus, report))
}
