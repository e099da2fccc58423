use tracing::{debug, info, warn};

use crate::db::StoreConnector;
use crate::error::PersistError;
use crate::shutdown::Cancel;
use crate::types::{BulkWriteResult, FundRecord, UpsertOperation};

/// One upsert per record, keyed by fund code, in record order.
pub fn build_operations(records: &[FundRecord]) -> Vec<UpsertOperation> {
    records.iter().map(UpsertOperation::from).collect()
}

/// Upsert `records` into `collection` as one batch.
///
/// No connection is opened for an empty batch. Otherwise the connection is
/// closed on every path, including a cancelled write.
pub async fn persist(
    connector: &dyn StoreConnector,
    collection: &str,
    records: &[FundRecord],
    cancel: &Cancel,
) -> Result<BulkWriteResult, PersistError> {
    if records.is_empty() {
        debug!("nothing to persist");
        return Ok(BulkWriteResult::default());
    }
    if cancel.is_cancelled() {
        return Err(PersistError::Cancelled);
    }

    let ops = build_operations(records);
    let mut session = connector.connect().await?;

    let outcome = tokio::select! {
        res = session.bulk_upsert(collection, &ops) => res,
        _ = cancel.cancelled() => {
            warn!(collection, "bulk write cancelled");
            Err(PersistError::Cancelled)
        }
    };
    session.close().await;

    let result = outcome?;
    info!(
        collection,
        upserted = result.upserted,
        matched = result.matched,
        modified = result.modified,
        "bulk upsert applied"
    );
    Ok(result)
}
