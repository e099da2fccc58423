use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CycleError, RowError};

// ---------------------------------------------------------------------------
// Raw table data
// ---------------------------------------------------------------------------

/// Cell text exactly as read from the rendered table, before any pairing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSnapshot {
    /// Text of the first header row's cells, left to right.
    pub headers: Vec<String>,
    /// One entry per body row, cells left to right.
    pub rows: Vec<Vec<String>>,
}

/// One body row keyed by header label.
///
/// All rows of a scrape share the same `columns` slice, so every row has the
/// same key set in the same order. `cells[i]` belongs to `columns[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Zero-based position of the row in the table body.
    pub index: usize,
    columns: Arc<[String]>,
    cells: Vec<String>,
}

impl RawRow {
    /// Callers guarantee `cells.len() == columns.len()`; the extractor rejects
    /// rows where that does not hold before constructing one.
    pub fn new(index: usize, columns: Arc<[String]>, cells: Vec<String>) -> Self {
        debug_assert_eq!(columns.len(), cells.len());
        Self { index, columns, cells }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == label)
            .and_then(|i| self.cells.get(i))
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Canonical fund record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundRecord {
    /// Fund ticker, e.g. `HGLG11`. Upsert key.
    pub code: String,
    pub category: String,
    pub price: f64,
    pub liquidity: f64,
    /// Stored as the parsed figure divided by 100, same rule as `dy`.
    pub pvpa: f64,
    /// Trailing 12-month dividend yield as a fraction.
    pub dy: f64,
}

/// The non-key fields an upsert replaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundFields {
    pub category: String,
    pub price: f64,
    pub liquidity: f64,
    pub pvpa: f64,
    pub dy: f64,
}

// ---------------------------------------------------------------------------
// Store operations
// ---------------------------------------------------------------------------

/// `filter: {code}`, `update: {$set: fields}`, `upsert: true`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOperation {
    pub filter_code: String,
    pub set: FundFields,
    pub upsert: bool,
}

impl From<&FundRecord> for UpsertOperation {
    fn from(r: &FundRecord) -> Self {
        Self {
            filter_code: r.code.clone(),
            set: FundFields {
                category: r.category.clone(),
                price: r.price,
                liquidity: r.liquidity,
                pvpa: r.pvpa,
                dy: r.dy,
            },
            upsert: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkWriteResult {
    /// Documents created because no document matched the filter.
    pub upserted: u64,
    /// Operations whose filter matched an existing document.
    pub matched: u64,
    /// Matched documents whose stored values actually changed.
    pub modified: u64,
}

// ---------------------------------------------------------------------------
// Cycle outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Extracting,
    Persisting,
    Done,
    Failed,
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CycleState::Extracting => "extracting",
            CycleState::Persisting => "persisting",
            CycleState::Done => "done",
            CycleState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
pub struct CycleReport {
    pub state: CycleState,
    /// Stage that was running when the cycle failed.
    pub failed_in: Option<CycleState>,
    pub error: Option<CycleError>,
    pub rows_extracted: usize,
    pub records_mapped: usize,
    pub rows_rejected: usize,
    /// Why each rejected row was dropped, in table order per stage.
    pub rejected: Vec<RowError>,
    pub written: Option<BulkWriteResult>,
    pub started_at_secs: u64,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        self.state == CycleState::Done
    }
}
