use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{RowShapeError, ScrapeError};
use crate::mapper::missing_columns;
use crate::render::{PageRenderer, RenderSession};
use crate::shutdown::Cancel;
use crate::types::{RawRow, TableSnapshot};

#[derive(Debug, Clone)]
pub struct ExtractTarget {
    pub url: String,
    pub table_selector: String,
    pub wait_timeout: Duration,
}

#[derive(Debug, Default)]
pub struct Extracted {
    pub rows: Vec<RawRow>,
    pub rejected: Vec<RowShapeError>,
}

/// Fetch the ranking page and return its body rows keyed by header label.
/// The render session is closed before returning, whatever the outcome.
pub async fn extract_rows(
    renderer: &dyn PageRenderer,
    target: &ExtractTarget,
    cancel: &Cancel,
) -> Result<Extracted, ScrapeError> {
    let mut session = renderer.launch().await?;
    let result = read_table(session.as_mut(), target, cancel).await;
    session.close().await;

    let snapshot = result?;
    debug!(
        columns = snapshot.headers.len(),
        rows = snapshot.rows.len(),
        "table read"
    );
    let extracted = pair_cells(snapshot)?;
    info!(
        rows = extracted.rows.len(),
        rejected = extracted.rejected.len(),
        "extracted ranking table"
    );
    Ok(extracted)
}

async fn read_table(
    session: &mut dyn RenderSession,
    target: &ExtractTarget,
    cancel: &Cancel,
) -> Result<TableSnapshot, ScrapeError> {
    if cancel.is_cancelled() {
        return Err(ScrapeError::Cancelled);
    }
    session.navigate(&target.url).await?;
    session
        .wait_for_selector(&target.table_selector, target.wait_timeout, cancel)
        .await?;
    session.evaluate_table(&target.table_selector).await
}

/// Check the header against the known columns, then zip each row with it.
pub fn pair_cells(snapshot: TableSnapshot) -> Result<Extracted, ScrapeError> {
    let missing = missing_columns(&snapshot.headers);
    if !missing.is_empty() {
        return Err(ScrapeError::SchemaMismatch { missing });
    }

    let columns: Arc<[String]> = snapshot.headers.into();
    let mut out = Extracted::default();
    for (index, cells) in snapshot.rows.into_iter().enumerate() {
        if cells.len() != columns.len() {
            let err = RowShapeError {
                row: index,
                expected: columns.len(),
                found: cells.len(),
            };
            warn!("skipping row: {err}");
            out.rejected.push(err);
            continue;
        }
        out.rows.push(RawRow::new(index, Arc::clone(&columns), cells));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::mapper::FIELD_COLUMNS;

    fn full_header() -> Vec<String> {
        FIELD_COLUMNS.iter().map(|(_, l)| l.to_string()).collect()
    }

    fn cells(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[derive(Clone, Copy)]
    enum Behaviour {
        Table,
        NeverAppears,
        NavigationFails,
    }

    struct FakeRenderer {
        behaviour: Behaviour,
        snapshot: TableSnapshot,
        closed: Arc<AtomicUsize>,
    }

    struct FakeSession {
        behaviour: Behaviour,
        snapshot: TableSnapshot,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PageRenderer for FakeRenderer {
        async fn launch(&self) -> Result<Box<dyn RenderSession>, ScrapeError> {
            Ok(Box::new(FakeSession {
                behaviour: self.behaviour,
                snapshot: self.snapshot.clone(),
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    #[async_trait]
    impl RenderSession for FakeSession {
        async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
            match self.behaviour {
                Behaviour::NavigationFails => Err(ScrapeError::Navigation {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                }),
                _ => Ok(()),
            }
        }

        async fn wait_for_selector(
            &mut self,
            selector: &str,
            timeout: Duration,
            _cancel: &Cancel,
        ) -> Result<(), ScrapeError> {
            match self.behaviour {
                Behaviour::NeverAppears => Err(ScrapeError::Timeout {
                    selector: selector.to_string(),
                    timeout,
                }),
                _ => Ok(()),
            }
        }

        async fn evaluate_table(&mut self, _sel: &str) -> Result<TableSnapshot, ScrapeError> {
            Ok(self.snapshot.clone())
        }

        async fn close(self: Box<Self>) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn target() -> ExtractTarget {
        ExtractTarget {
            url: "https://example.test/ranking".to_string(),
            table_selector: ".t".to_string(),
            wait_timeout: Duration::from_millis(10),
        }
    }

    fn fake(behaviour: Behaviour, snapshot: TableSnapshot) -> FakeRenderer {
        FakeRenderer {
            behaviour,
            snapshot,
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[tokio::test]
    async fn pairs_cells_with_headers_in_order() {
        let renderer = fake(
            Behaviour::Table,
            TableSnapshot {
                headers: full_header(),
                rows: vec![
                    cells(&["ABCD11", "Shoppings", "100,50", "1.000.000,00", "1,02", "8,75%"]),
                    cells(&["WXYZ11", "N/A", "N/A", "N/A", "N/A", "N/A"]),
                ],
            },
        );
        let out = extract_rows(&renderer, &target(), &Cancel::never()).await.unwrap();
        assert_eq!(out.rows.len(), 2);
        assert!(out.rejected.is_empty());
        assert_eq!(out.rows[0].get("Fundos"), Some("ABCD11"));
        assert_eq!(out.rows[0].get("DY (12M) Acumulado"), Some("8,75%"));
        assert_eq!(out.rows[1].get("Fundos"), Some("WXYZ11"));
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_closes_session() {
        let renderer = fake(Behaviour::NeverAppears, TableSnapshot::default());
        let err = extract_rows(&renderer, &target(), &Cancel::never()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Timeout { .. }));
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn navigation_failure_closes_session() {
        let renderer = fake(Behaviour::NavigationFails, TableSnapshot::default());
        let err = extract_rows(&renderer, &target(), &Cancel::never()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Navigation { .. }));
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn already_cancelled_skips_navigation() {
        let renderer = fake(Behaviour::Table, TableSnapshot::default());
        let (handle, cancel) = crate::shutdown::cancel_pair();
        handle.cancel();
        let err = extract_rows(&renderer, &target(), &cancel).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Cancelled));
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn renamed_column_is_schema_mismatch() {
        let mut headers = full_header();
        headers[4] = "P/VP".to_string();
        let renderer = fake(Behaviour::Table, TableSnapshot { headers, rows: vec![] });
        let err = extract_rows(&renderer, &target(), &Cancel::never()).await.unwrap_err();
        match err {
            ScrapeError::SchemaMismatch { missing } => assert_eq!(missing, ["P/VPA"]),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wrong_width_rows_are_rejected() {
        let snap = TableSnapshot {
            headers: full_header(),
            rows: vec![
                cells(&["AAAA11", "Lajes", "1", "1", "1"]),
                cells(&["BBBB11", "Lajes", "1", "1", "1", "1"]),
                cells(&["CCCC11", "Lajes", "1", "1", "1", "1", "extra"]),
            ],
        };
        let out = pair_cells(snap).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].index, 1);
        assert_eq!(
            out.rejected,
            vec![
                RowShapeError { row: 0, expected: 6, found: 5 },
                RowShapeError { row: 2, expected: 6, found: 7 },
            ]
        );
    }

    #[test]
    fn extra_columns_are_allowed() {
        let mut headers = full_header();
        headers.insert(2, "Dividendo".to_string());
        let snap = TableSnapshot {
            headers,
            rows: vec![cells(&["AAAA11", "Lajes", "0,80", "1", "1", "1", "1"])],
        };
        let out = pair_cells(snap).unwrap();
        assert_eq!(out.rows[0].get("Preço Atual (R$)"), Some("1"));
        assert_eq!(out.rows[0].get("Dividendo"), Some("0,80"));
    }
}
