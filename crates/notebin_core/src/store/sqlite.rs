//! SQLite backend: collections stored row-per-record in position order.
//!
//! # Invariants
//! - `save` replaces one collection inside a single immediate transaction.
//! - Record ids are unique within one collection.
//! - `collection_meta` mirrors the count and time of the last save.

use super::{CollectionStore, Record, StoreError, StoreResult};
use crate::db::{open_db, open_db_in_memory};
use crate::model::Timestamp;
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared, migrated SQLite connection used by every collection of one
/// workspace.
#[derive(Clone)]
pub struct SqliteHandle {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHandle {
    /// Opens (or creates) the database file and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Returns the store for one named collection.
    pub fn collection(&self, name: &'static str) -> SqliteCollectionStore {
        SqliteCollectionStore {
            handle: self.clone(),
            collection: name,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic inside a transaction rolls it back on drop, so the
        // connection is still consistent.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bookkeeping recorded with every save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    pub record_count: usize,
    pub saved_at: Timestamp,
}

/// One named collection inside a [`SqliteHandle`] database.
#[derive(Clone)]
pub struct SqliteCollectionStore {
    handle: SqliteHandle,
    collection: &'static str,
}

impl SqliteCollectionStore {
    pub fn collection(&self) -> &'static str {
        self.collection
    }

    /// Returns stats of the last save, or `None` when never saved.
    pub fn stats(&self) -> StoreResult<Option<CollectionStats>> {
        let conn = self.handle.lock();
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT record_count, saved_at
                 FROM collection_meta
                 WHERE collection = ?1;",
                [self.collection],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((record_count, saved_at)) = row else {
            return Ok(None);
        };
        let saved_at = DateTime::parse_from_rfc3339(&saved_at)
            .map_err(|err| {
                StoreError::Unavailable(format!(
                    "invalid saved_at `{saved_at}` for collection `{}`: {err}",
                    self.collection
                ))
            })?
            .with_timezone(&Utc);
        Ok(Some(CollectionStats {
            record_count: usize::try_from(record_count).unwrap_or_default(),
            saved_at,
        }))
    }
}

impl<T: Record> CollectionStore<T> for SqliteCollectionStore {
    fn load(&self) -> StoreResult<Vec<T>> {
        let conn = self.handle.lock();
        let mut stmt = conn.prepare(
            "SELECT position, payload
             FROM collection_records
             WHERE collection = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([self.collection])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let position: i64 = row.get(0)?;
            let payload: String = row.get(1)?;
            let record =
                serde_json::from_str(&payload).map_err(|source| StoreError::Malformed {
                    location: format!(
                        "collection_records[{}:{position}]",
                        self.collection
                    ),
                    source,
                })?;
            records.push(record);
        }
        Ok(records)
    }

    fn save(&self, records: &[T]) -> StoreResult<()> {
        let payloads = records
            .iter()
            .map(|record| {
                serde_json::to_string(record).map(|payload| (record.record_id(), payload))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Encode)?;

        let mut conn = self.handle.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM collection_records WHERE collection = ?1;",
            [self.collection],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO collection_records (collection, position, record_id, payload)
                 VALUES (?1, ?2, ?3, ?4);",
            )?;
            for (position, (record_id, payload)) in payloads.iter().enumerate() {
                insert.execute(params![self.collection, position as i64, record_id, payload])?;
            }
        }
        tx.execute(
            "INSERT INTO collection_meta (collection, record_count, saved_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(collection) DO UPDATE SET
                record_count = excluded.record_count,
                saved_at = excluded.saved_at;",
            params![
                self.collection,
                payloads.len() as i64,
                Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()?;

        debug!(
            "event=collection_save module=store status=ok backend=sqlite collection={} records={}",
            self.collection,
            payloads.len()
        );
        Ok(())
    }
}
