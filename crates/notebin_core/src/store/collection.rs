//! Single-writer guard around a collection store.

use super::{CollectionStore, Record, StoreError};
use log::error;
use std::marker::PhantomData;
use std::sync::{Mutex, PoisonError};

/// Result of one mutation closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<R> {
    /// Records changed; persist them before returning.
    Changed(R),
    /// Nothing changed; skip the write.
    Unchanged(R),
}

/// One entity collection with serialized read-mutate-write access.
///
/// Every operation re-reads the backing store; nothing is cached between
/// calls.
pub struct Collection<T, S> {
    name: &'static str,
    store: S,
    lock: Mutex<()>,
    _records: PhantomData<fn() -> T>,
}

impl<T: Record, S: CollectionStore<T>> Collection<T, S> {
    pub fn new(name: &'static str, store: S) -> Self {
        Self {
            name,
            store,
            lock: Mutex::new(()),
            _records: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Loads the full collection.
    pub fn read(&self) -> Result<Vec<T>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load_logged()
    }

    /// Loads the collection and runs `inspect` with the lock still held.
    ///
    /// Writers of this collection wait until `inspect` returns.
    pub fn read_with<R>(&self, inspect: impl FnOnce(&[T]) -> R) -> Result<R, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let records = self.load_logged()?;
        Ok(inspect(&records))
    }

    /// Runs one read-mutate-write cycle under the collection lock.
    ///
    /// The collection is saved only when `mutate` returns
    /// `Ok(Outcome::Changed(_))`. An error from `mutate` leaves the persisted
    /// collection untouched.
    pub fn mutate<R, E>(
        &self,
        mutate: impl FnOnce(&mut Vec<T>) -> Result<Outcome<R>, E>,
    ) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        // The backing store still holds the last complete save after a panic.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records = self.load_logged()?;
        match mutate(&mut records)? {
            Outcome::Changed(value) => {
                self.store.save(&records).map_err(|err| {
                    error!(
                        "event=collection_save module=store status=error collection={} records={} error={}",
                        self.name,
                        records.len(),
                        err
                    );
                    err
                })?;
                Ok(value)
            }
            Outcome::Unchanged(value) => Ok(value),
        }
    }

    fn load_logged(&self) -> Result<Vec<T>, StoreError> {
        self.store.load().map_err(|err| {
            error!(
                "event=collection_load module=store status=error collection={} error={}",
                self.name, err
            );
            err
        })
    }
}
