//! JSON file backend: one pretty-printed array per collection.
//!
//! # Invariants
//! - A missing file is an empty collection.
//! - Saves go through a sibling temp file renamed over the target, so a
//!   concurrent reader sees either the previous or the next array.

use super::{CollectionStore, Record, StoreError, StoreResult};
use log::debug;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File-backed collection store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl<T: Record> CollectionStore<T> for JsonFileStore {
    fn load(&self) -> StoreResult<Vec<T>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(
                    "event=collection_load module=store status=ok backend=json missing_file=true"
                );
                return Ok(Vec::new());
            }
            Err(err) => return Err(self.io_error(err)),
        };

        serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
            location: self.path.display().to_string(),
            source,
        })
    }

    fn save(&self, records: &[T]) -> StoreResult<()> {
        let mut encoded = serde_json::to_vec_pretty(records).map_err(StoreError::Encode)?;
        encoded.push(b'\n');

        let dir = self.parent_dir();
        std::fs::create_dir_all(dir).map_err(|err| self.io_error(err))?;

        let mut staged = NamedTempFile::new_in(dir).map_err(|err| self.io_error(err))?;
        staged
            .write_all(&encoded)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|err| self.io_error(err))?;
        staged
            .persist(&self.path)
            .map_err(|err| self.io_error(err.error))?;

        debug!(
            "event=collection_save module=store status=ok backend=json records={}",
            records.len()
        );
        Ok(())
    }
}
