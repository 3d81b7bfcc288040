//! Whole-collection persistence adapters.
//!
//! # Responsibility
//! - Load and save one entity collection as a single unit.
//! - Serialize read-mutate-write cycles per collection (`Collection`).
//!
//! # Invariants
//! - `load` returns records in stored order; `save` replaces all of them.
//! - A reader never observes a partially written collection.
//! - At most one read-mutate-write cycle runs per `Collection` at a time.

mod collection;
mod json_file;
mod memory;
mod sqlite;

pub use collection::{Collection, Outcome};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::{CollectionStats, SqliteCollectionStore, SqliteHandle};

use crate::db::DbError;
use crate::model::folder::Folder;
use crate::model::note::Note;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure to read or write a backing collection.
///
/// Every variant means the collection is unavailable to the caller; the
/// variants only differ in diagnostics.
#[derive(Debug)]
pub enum StoreError {
    /// File-system access failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Persisted bytes could not be decoded into records.
    Malformed {
        location: String,
        source: serde_json::Error,
    },
    /// Records could not be encoded for persistence.
    Encode(serde_json::Error),
    /// SQLite backend failure.
    Db(DbError),
    /// Backend refused the operation.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "collection file `{}` unavailable: {source}", path.display())
            }
            Self::Malformed { location, source } => {
                write!(f, "malformed collection data in {location}: {source}")
            }
            Self::Encode(err) => write!(f, "failed to encode collection: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "collection unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Malformed { source, .. } => Some(source),
            Self::Encode(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// A persisted record with a stable id.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + 'static {
    fn record_id(&self) -> &str;
}

impl Record for Folder {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for Note {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Backing resource for one full collection of records.
pub trait CollectionStore<T: Record>: Send + Sync {
    /// Loads every record in stored order.
    fn load(&self) -> StoreResult<Vec<T>>;
    /// Replaces the whole collection with `records`.
    fn save(&self, records: &[T]) -> StoreResult<()>;
}

impl<T: Record, S: CollectionStore<T> + ?Sized> CollectionStore<T> for Box<S> {
    fn load(&self) -> StoreResult<Vec<T>> {
        (**self).load()
    }

    fn save(&self, records: &[T]) -> StoreResult<()> {
        (**self).save(records)
    }
}
