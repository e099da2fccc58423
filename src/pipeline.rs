use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::db::StoreConnector;
use crate::error::{CycleError, RowError};
use crate::extractor::{extract_rows, ExtractTarget};
use crate::mapper::map_rows;
use crate::persister::persist;
use crate::render::PageRenderer;
use crate::shutdown::Cancel;
use crate::types::{CycleReport, CycleState, FundRecord};

impl From<&Config> for ExtractTarget {
    fn from(cfg: &Config) -> Self {
        Self {
            url: cfg.ranking_url.clone(),
            table_selector: cfg.table_selector.clone(),
            wait_timeout: Duration::from_secs(cfg.wait_timeout_secs),
        }
    }
}

/// Run one extract → map → persist cycle. With `store == None` the cycle
/// stops after mapping.
///
/// Never panics and never returns an error: failures end up in the report.
pub async fn run_cycle(
    cfg: &Config,
    renderer: &dyn PageRenderer,
    store: Option<&dyn StoreConnector>,
    cancel: &Cancel,
) -> CycleReport {
    let started_at_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let span = info_span!("cycle", started_at = started_at_secs);

    let report = run_stages(cfg, renderer, store, cancel, started_at_secs)
        .instrument(span.clone())
        .await;

    span.in_scope(|| log_summary(&report));
    report
}

async fn run_stages(
    cfg: &Config,
    renderer: &dyn PageRenderer,
    store: Option<&dyn StoreConnector>,
    cancel: &Cancel,
    started_at_secs: u64,
) -> CycleReport {
    let clock = Instant::now();
    let mut report = CycleReport {
        state: CycleState::Extracting,
        failed_in: None,
        error: None,
        rows_extracted: 0,
        records_mapped: 0,
        rows_rejected: 0,
        rejected: Vec::new(),
        written: None,
        started_at_secs,
        elapsed: Duration::ZERO,
    };

    // ---- Extracting -------------------------------------------------------
    let extracted = match extract_rows(renderer, &ExtractTarget::from(cfg), cancel).await {
        Ok(e) => e,
        Err(e) => {
            fail(&mut report, e.into());
            report.elapsed = clock.elapsed();
            return report;
        }
    };
    let mapped = map_rows(&extracted.rows);
    report.rows_extracted = extracted.rows.len() + extracted.rejected.len();
    report.records_mapped = mapped.records.len();
    report.rejected = extracted
        .rejected
        .into_iter()
        .map(RowError::from)
        .chain(mapped.rejected.into_iter().map(RowError::from))
        .collect();
    report.rows_rejected = report.rejected.len();

    // ---- Persisting -------------------------------------------------------
    match store {
        None => log_batch(&mapped.records),
        Some(store) => {
            report.state = CycleState::Persisting;
            match persist(store, &cfg.collection, &mapped.records, cancel).await {
                Ok(written) => report.written = Some(written),
                Err(e) => {
                    fail(&mut report, e.into());
                    report.elapsed = clock.elapsed();
                    return report;
                }
            }
        }
    }

    report.state = CycleState::Done;
    report.elapsed = clock.elapsed();
    report
}

fn fail(report: &mut CycleReport, err: CycleError) {
    report.failed_in = Some(report.state);
    report.state = CycleState::Failed;
    report.error = Some(err);
}

fn log_batch(records: &[FundRecord]) {
    match serde_json::to_string(records) {
        Ok(json) => debug!(records = %json, "scraped batch (persistence disabled)"),
        Err(e) => warn!("could not serialize scraped batch: {e}"),
    }
}

fn log_summary(report: &CycleReport) {
    let elapsed_ms = report.elapsed.as_millis() as u64;
    match (&report.error, report.failed_in) {
        (Some(err), Some(stage)) => error!(
            stage = %stage,
            rows = report.rows_extracted,
            elapsed_ms,
            "cycle failed: {err}"
        ),
        _ => {
            if let Some(first) = report.rejected.first() {
                warn!(rejected = report.rows_rejected, "rows dropped this cycle, first: {first}");
            }
            let written = report.written.unwrap_or_default();
            info!(
                rows = report.rows_extracted,
                mapped = report.records_mapped,
                rejected = report.rows_rejected,
                upserted = written.upserted,
                matched = written.matched,
                modified = written.modified,
                persisted = report.written.is_some(),
                started_at = report.started_at_secs,
                elapsed_ms,
                "cycle done"
            );
        }
    }
}
