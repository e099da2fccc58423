use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{validate_collection, StoreConnector, StoreSession};
use crate::error::PersistError;
use crate::types::{BulkWriteResult, FundFields, FundRecord, UpsertOperation};

type Collection = BTreeMap<String, FundFields>;

/// Process-local store. Contents are lost on exit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    /// collection → code → fields
    collections: Arc<DashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn get(&self, collection: &str, code: &str) -> Option<FundRecord> {
        let coll = self.collections.get(collection)?;
        coll.get(code).map(|f| FundRecord {
            code: code.to_string(),
            category: f.category.clone(),
            price: f.price,
            liquidity: f.liquidity,
            pvpa: f.pvpa,
            dy: f.dy,
        })
    }

    #[cfg(test)]
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |c| c.len())
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn StoreSession>, PersistError> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl StoreSession for MemoryStore {
    async fn bulk_upsert(
        &mut self,
        collection: &str,
        ops: &[UpsertOperation],
    ) -> Result<BulkWriteResult, PersistError> {
        validate_collection(collection)?;

        // The entry guard holds the shard lock, so readers see all of the
        // batch or none of it.
        let mut coll = self.collections.entry(collection.to_string()).or_default();
        let mut result = BulkWriteResult::default();
        for op in ops {
            match coll.get_mut(&op.filter_code) {
                Some(existing) => {
                    result.matched += 1;
                    if *existing != op.set {
                        *existing = op.set.clone();
                        result.modified += 1;
                    }
                }
                None if op.upsert => {
                    coll.insert(op.filter_code.clone(), op.set.clone());
                    result.upserted += 1;
                }
                None => {}
            }
        }
        Ok(result)
    }

    async fn close(self: Box<Self>) {}
}
