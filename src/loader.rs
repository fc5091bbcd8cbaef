//! Dataset loading with encoding detection and content-keyed memoization.
//!
//! [`load`] reads a delimited text file once, then walks the encoding priority
//! list from [`io_utils::encoding_candidates`] until one candidate both decodes
//! strictly and parses as CSV. [`DatasetCache`] keeps parsed datasets keyed by
//! path and reuses them for as long as the file's SHA-256 digest is unchanged.

use std::{
    collections::HashMap,
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, bail};
use log::{debug, info};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::io_utils::{self, EncodingCandidate};

/// An immutable table of raw string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Builds a dataset, trimming surrounding whitespace from header names.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers
            .into_iter()
            .map(|name| name.trim().to_string())
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Raw cell text; out-of-range positions read as empty.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Iterates one column's cells in row order.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |cells| cells.get(column).map(String::as_str).unwrap_or(""))
    }
}

/// Why a single encoding attempt was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingFailure {
    pub encoding: &'static str,
    pub reason: String,
}

impl fmt::Display for EncodingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.encoding, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unable to read {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(
        "Unable to open {path:?} as CSV with any supported encoding; check the encoding or path ({})",
        join_failures(.attempts)
    )]
    Undecodable {
        path: PathBuf,
        attempts: Vec<EncodingFailure>,
    },
}

fn join_failures(attempts: &[EncodingFailure]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Loads `path`, choosing the delimiter from the file extension.
pub fn load(path: &Path) -> Result<Dataset, LoadError> {
    load_with_delimiter(path, io_utils::resolve_input_delimiter(path, None))
}

pub fn load_with_delimiter(path: &Path, delimiter: u8) -> Result<Dataset, LoadError> {
    let bytes = read_source(path)?;
    parse_bytes(path, &bytes, delimiter)
}

fn read_source(path: &Path) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|source| LoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_bytes(path: &Path, bytes: &[u8], delimiter: u8) -> Result<Dataset, LoadError> {
    let mut attempts = Vec::new();
    for candidate in io_utils::encoding_candidates() {
        match parse_with(bytes, &candidate, delimiter) {
            Ok(dataset) => {
                info!(
                    "Loaded {} row(s) x {} column(s) from {:?} as {}",
                    dataset.row_count(),
                    dataset.headers().len(),
                    path,
                    candidate.label
                );
                return Ok(dataset);
            }
            Err(err) => {
                debug!("Encoding {} rejected for {:?}: {err:#}", candidate.label, path);
                attempts.push(EncodingFailure {
                    encoding: candidate.label,
                    reason: format!("{err:#}"),
                });
            }
        }
    }
    Err(LoadError::Undecodable {
        path: path.to_path_buf(),
        attempts,
    })
}

fn parse_with(
    bytes: &[u8],
    candidate: &EncodingCandidate,
    delimiter: u8,
) -> anyhow::Result<Dataset> {
    let text = io_utils::decode_strict(bytes, candidate)?;
    let mut reader = io_utils::open_csv_reader(text.as_bytes(), delimiter);
    let headers = reader
        .headers()
        .context("Reading header row")?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let width = headers.len();
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let line = idx + 2;
        let record = record.with_context(|| format!("Reading row {line}"))?;
        if record.len() > width {
            bail!(
                "Reading row {line}: found {} field(s), but the header has {width}",
                record.len()
            );
        }
        let mut cells = record.iter().map(str::to_string).collect::<Vec<_>>();
        cells.resize(width, String::new());
        rows.push(cells);
    }
    Ok(Dataset::new(headers, rows))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    delimiter: u8,
}

#[derive(Debug)]
struct CacheEntry {
    digest: Vec<u8>,
    dataset: Arc<Dataset>,
}

/// Memoizes parsed datasets by source path and content digest.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached dataset while the file bytes are unchanged, and
    /// reparses otherwise. A failed load evicts any previous entry.
    pub fn load(&mut self, path: &Path, delimiter: Option<u8>) -> Result<Arc<Dataset>, LoadError> {
        let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
        let key = CacheKey {
            path: fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()),
            delimiter,
        };
        let bytes = match read_source(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.entries.remove(&key);
                return Err(err);
            }
        };
        let digest = Sha256::digest(&bytes).to_vec();

        if let Some(entry) = self.entries.get(&key)
            && entry.digest == digest
        {
            debug!("Dataset cache hit for {:?}", key.path);
            return Ok(Arc::clone(&entry.dataset));
        }

        debug!("Dataset cache miss for {:?}", key.path);
        match parse_bytes(path, &bytes, delimiter) {
            Ok(dataset) => {
                let dataset = Arc::new(dataset);
                self.entries.insert(
                    key,
                    CacheEntry {
                        digest,
                        dataset: Arc::clone(&dataset),
                    },
                );
                Ok(dataset)
            }
            Err(err) => {
                self.entries.remove(&key);
                Err(err)
            }
        }
    }

    /// Drops every entry for `path`; returns whether anything was removed.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let before = self.entries.len();
        self.entries.retain(|key, _| key.path != target);
        before != self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
