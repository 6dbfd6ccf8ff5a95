//! Error taxonomy for the ETL pipeline
//!
//! Each pipeline stage fails with its own error kind:
//! - [`FetchError`]: network or HTTP failure, or an error payload from a provider
//! - [`DataError`]: empty, unparseable or structurally invalid input
//! - [`PersistError`]: the destination could not be written
//!
//! None of them are retried. [`EtlError`] wraps all three for callers that
//! drive the whole pipeline.

use crate::data::Source;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while pulling raw data from a provider.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("HTTP request to {provider} failed: {source}")]
    Http {
        provider: Source,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: Source,
        status: u16,
        body: String,
    },

    #[error("{provider} API reported errors: {}", messages.join("; "))]
    Provider {
        provider: Source,
        messages: Vec<String>,
    },

    #[error("{provider} response could not be decoded: {message}")]
    Decode { provider: Source, message: String },

    #[error("Kraken response does not contain OHLC data for pair {pair}")]
    MissingPair { pair: String },

    #[error("Kraken does not support a {0} minute interval")]
    UnsupportedInterval(u32),
}

/// Input that cannot be turned into candles.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("no {provider} rows to normalize")]
    EmptyInput { provider: Source },

    #[error("none of the {rows} {provider} timestamps could be parsed")]
    UnparseableTimestamps { provider: Source, rows: usize },

    #[error("invalid normalization parameters: {0}")]
    InvalidParams(String),

    #[error("time span covers {buckets} buckets, more than the limit of {limit}")]
    SpanTooLarge { buckets: i64, limit: i64 },

    #[error("nothing to combine: no normalized tables given")]
    NoTables,

    #[error("column `{column}` missing from {}", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Failure while writing candles to their destination.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error writing {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("database write to `{table}` failed: {message}")]
    Database { table: String, message: String },
}

impl PersistError {
    /// Wrap any database driver error for the given table.
    pub fn database(table: &str, err: impl std::fmt::Display) -> Self {
        Self::Database {
            table: table.to_string(),
            message: err.to_string(),
        }
    }
}

/// Any pipeline failure.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}
