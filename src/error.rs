use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("could not start render session: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("selector `{selector}` not present after {timeout:?}")]
    Timeout { selector: String, timeout: Duration },

    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("no table matched `{0}`")]
    TableNotFound(String),

    #[error("page evaluation failed: {0}")]
    Evaluation(String),

    #[error("table header is missing expected columns: {missing:?}")]
    SchemaMismatch { missing: Vec<String> },

    #[error("extraction cancelled")]
    Cancelled,
}

/// A body row whose cell count differs from the header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {row}: expected {expected} cells, found {found}")]
pub struct RowShapeError {
    pub row: usize,
    pub expected: usize,
    pub found: usize,
}

// ---------------------------------------------------------------------------
// Normalization / mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{input}` is not a locale-formatted number")]
pub struct NumberParseError {
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("row {row}: missing field `{field}`")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row}: field `{field}`: {source}")]
    InvalidNumber {
        row: usize,
        field: &'static str,
        #[source]
        source: NumberParseError,
    },

    #[error("row {row}: empty fund code")]
    EmptyCode { row: usize },
}

/// Any reason a single row was dropped from the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error(transparent)]
    Shape(#[from] RowShapeError),

    #[error(transparent)]
    Map(#[from] MapError),
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("store unreachable: {0}")]
    Connect(String),

    #[error("bulk write failed: {0}")]
    Write(String),

    #[error("invalid collection name `{0}`")]
    InvalidCollection(String),

    #[error("bulk write cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("scrape failed: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("persist failed: {0}")]
    Persist(#[from] PersistError),
}
