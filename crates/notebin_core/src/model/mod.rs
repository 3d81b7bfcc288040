//! Domain model for the folder hierarchy and the notes it contains.
//!
//! # Responsibility
//! - Define the persisted record shapes for folders and notes.
//! - Define the derived `FolderTree` read model.
//!
//! # Invariants
//! - Every record is identified by a stable string id that is never reused.
//! - Notes are removed logically (`is_deleted`), never physically.
//! - `Note::size` always matches the current `content`.

pub mod folder;
pub mod note;

use chrono::{DateTime, Utc};

/// Owner tag carried on every record. Not an access-control boundary.
pub type UserId = u64;

/// Owner assigned when a caller does not name one.
pub const DEFAULT_USER_ID: UserId = 1;

/// UTC timestamp, serialized as RFC 3339 text.
pub type Timestamp = DateTime<Utc>;

pub(crate) fn now() -> Timestamp {
    Utc::now()
}

pub(crate) fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
