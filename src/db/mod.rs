//! Store collaborator: scoped connections that apply a batch of upserts.

pub mod memory;
pub mod models;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::PersistError;
use crate::types::{BulkWriteResult, UpsertOperation};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn StoreSession>, PersistError>;
}

#[async_trait]
pub trait StoreSession: Send {
    /// Applies every operation or none of them.
    async fn bulk_upsert(
        &mut self,
        collection: &str,
        ops: &[UpsertOperation],
    ) -> Result<BulkWriteResult, PersistError>;

    async fn close(self: Box<Self>);
}

/// Collection names become table names, so only `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_collection(name: &str) -> Result<(), PersistError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PersistError::InvalidCollection(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names() {
        assert!(validate_collection("fii_data").is_ok());
        assert!(validate_collection("_x1").is_ok());
        assert!(validate_collection("").is_err());
        assert!(validate_collection("1abc").is_err());
        assert!(validate_collection("fii; DROP TABLE x").is_err());
    }
}
