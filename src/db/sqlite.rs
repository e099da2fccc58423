use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::{debug, info, warn};

use super::models::FundRow;
use super::{validate_collection, StoreConnector, StoreSession};
use crate::error::PersistError;
use crate::types::{BulkWriteResult, UpsertOperation};

/// SQLite-backed document store: one table per collection, `code` as the
/// primary key. A connection is opened per batch and closed right after.
pub struct SqliteStore {
    path: String,
    options: SqliteConnectOptions,
}

impl SqliteStore {
    pub fn new(db_path: &str) -> Self {
        Self {
            path: db_path.to_string(),
            options: SqliteConnectOptions::new()
                .filename(db_path)
                .create_if_missing(true),
        }
    }

    /// Create the database file and apply migrations ahead of the first cycle.
    pub async fn prepare(&self) -> crate::error::Result<()> {
        let mut conn = self.options.connect().await?;
        let migrated = sqlx::migrate!("./migrations").run_direct(&mut conn).await;
        close_quietly(conn).await;
        migrated?;
        info!(path = %self.path, "database ready");
        Ok(())
    }

    /// All documents of `collection`, ordered by code.
    #[cfg(test)]
    pub async fn fetch_all(&self, collection: &str) -> Result<Vec<FundRow>, PersistError> {
        validate_collection(collection)?;
        let mut conn = self.open().await?;
        let rows = sqlx::query_as::<_, FundRow>(&format!(
            "SELECT code, category, price, liquidity, pvpa, dy FROM {collection} ORDER BY code"
        ))
        .fetch_all(&mut conn)
        .await
        .map_err(|e| PersistError::Write(e.to_string()));
        close_quietly(conn).await;
        rows
    }

    async fn open(&self) -> Result<SqliteConnection, PersistError> {
        let mut conn = self
            .options
            .connect()
            .await
            .map_err(|e| PersistError::Connect(e.to_string()))?;
        if let Err(e) = sqlx::migrate!("./migrations").run_direct(&mut conn).await {
            close_quietly(conn).await;
            return Err(PersistError::Connect(format!("migration failed: {e}")));
        }
        Ok(conn)
    }
}

#[async_trait]
impl StoreConnector for SqliteStore {
    async fn connect(&self) -> Result<Box<dyn StoreSession>, PersistError> {
        let conn = self.open().await?;
        debug!(path = %self.path, "store connection opened");
        Ok(Box::new(SqliteSession { conn }))
    }
}

struct SqliteSession {
    conn: SqliteConnection,
}

#[async_trait]
impl StoreSession for SqliteSession {
    async fn bulk_upsert(
        &mut self,
        collection: &str,
        ops: &[UpsertOperation],
    ) -> Result<BulkWriteResult, PersistError> {
        validate_collection(collection)?;
        let write_err = |e: sqlx::Error| PersistError::Write(e.to_string());

        let select = format!(
            "SELECT code, category, price, liquidity, pvpa, dy FROM {collection} WHERE code = ?"
        );
        let insert = format!(
            "INSERT INTO {collection} (code, category, price, liquidity, pvpa, dy) VALUES (?, ?, ?, ?, ?, ?)"
        );
        let update = format!(
            "UPDATE {collection} SET category = ?, price = ?, liquidity = ?, pvpa = ?, dy = ? WHERE code = ?"
        );

        let mut result = BulkWriteResult::default();

        // Dropping `tx` without commit rolls the whole batch back.
        let mut tx = self.conn.begin().await.map_err(write_err)?;
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {collection} (
                code      TEXT PRIMARY KEY NOT NULL,
                category  TEXT NOT NULL,
                price     REAL NOT NULL,
                liquidity REAL NOT NULL,
                pvpa      REAL NOT NULL,
                dy        REAL NOT NULL
            )"
        ))
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        for op in ops {
            let existing = sqlx::query_as::<_, FundRow>(&select)
                .bind(&op.filter_code)
                .fetch_optional(&mut *tx)
                .await
                .map_err(write_err)?;

            match existing {
                None if op.upsert => {
                    sqlx::query(&insert)
                        .bind(&op.filter_code)
                        .bind(&op.set.category)
                        .bind(op.set.price)
                        .bind(op.set.liquidity)
                        .bind(op.set.pvpa)
                        .bind(op.set.dy)
                        .execute(&mut *tx)
                        .await
                        .map_err(write_err)?;
                    result.upserted += 1;
                }
                None => {}
                Some(row) => {
                    result.matched += 1;
                    if row.fields() != op.set {
                        sqlx::query(&update)
                            .bind(&op.set.category)
                            .bind(op.set.price)
                            .bind(op.set.liquidity)
                            .bind(op.set.pvpa)
                            .bind(op.set.dy)
                            .bind(&op.filter_code)
                            .execute(&mut *tx)
                            .await
                            .map_err(write_err)?;
                        result.modified += 1;
                    }
                }
            }
        }
        tx.commit().await.map_err(write_err)?;

        Ok(result)
    }

    async fn close(self: Box<Self>) {
        close_quietly(self.conn).await;
    }
}

async fn close_quietly(conn: SqliteConnection) {
    if let Err(e) = conn.close().await {
        warn!("closing store connection failed: {e}");
    }
}
