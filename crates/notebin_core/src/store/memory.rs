use super::{CollectionStore, Record, StoreError, StoreResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// In-memory collection store.
///
/// Intended for tests and embedding. Records are cloned on load and save.
pub struct MemoryStore<T> {
    records: Mutex<Vec<T>>,
    saves: AtomicUsize,
    available: bool,
}

impl<T: Record> MemoryStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// Creates a store seeded with `records` in the given order.
    pub fn with_records(records: Vec<T>) -> Self {
        Self {
            records: Mutex::new(records),
            saves: AtomicUsize::new(0),
            available: true,
        }
    }

    /// Creates a store whose every load and save fails.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of the currently stored records.
    pub fn snapshot(&self) -> Vec<T> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "memory store configured as unavailable".to_string(),
            ))
        }
    }
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> CollectionStore<T> for MemoryStore<T> {
    fn load(&self) -> StoreResult<Vec<T>> {
        self.ensure_available()?;
        Ok(self.snapshot())
    }

    fn save(&self, records: &[T]) -> StoreResult<()> {
        self.ensure_available()?;
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = records.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl<T: Record> CollectionStore<T> for std::sync::Arc<MemoryStore<T>> {
    fn load(&self) -> StoreResult<Vec<T>> {
        self.as_ref().load()
    }

    fn save(&self, records: &[T]) -> StoreResult<()> {
        self.as_ref().save(records)
    }
}
