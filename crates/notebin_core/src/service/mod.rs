//! Folder and note use-case services.
//!
//! # Responsibility
//! - Run every operation as one read-mutate-write cycle over a collection.
//! - Validate hierarchy invariants before anything is written.
//!
//! # Invariants
//! - Single-record lookups return `Option`; mutations on a missing id
//!   return a `NotFound` error; deletes return `false`.
//! - A rejected operation never saves its collection.

pub mod folder_service;
pub mod note_service;

/// Coarse error class for callers that translate failures into responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced record does not exist.
    NotFound,
    /// Input was rejected before anything was written.
    InvalidInput,
    /// Backing collection could not be read or written.
    StorageUnavailable,
}
