//! Note record and soft-delete lifecycle helpers.
//!
//! # Invariants
//! - `size` equals the number of chars in `content` after every write.
//! - `is_deleted` is the source of truth for recycle-bin membership.
//! - Stored notes may omit `userId`, `size` and timestamps; loading fills
//!   them in and always recomputes `size`.

use super::folder::FolderId;
use super::{new_record_id, now, Timestamp, UserId, DEFAULT_USER_ID};
use serde::{Deserialize, Serialize};

/// Stable note identifier.
pub type NoteId = String;

/// Persisted note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredNote")]
pub struct Note {
    pub id: NoteId,
    /// Folder that currently owns this note.
    pub folder_id: FolderId,
    pub user_id: UserId,
    pub content: String,
    /// Derived from `content`; see [`content_size`].
    pub size: usize,
    /// Soft delete tombstone. Deleted notes live in the recycle bin.
    pub is_deleted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Note {
    /// Creates an active note with a generated id.
    pub fn new(folder_id: impl Into<FolderId>, content: impl Into<String>, user_id: UserId) -> Self {
        Self::with_id(new_record_id(), folder_id, content, user_id)
    }

    /// Creates an active note with a caller-provided id.
    pub fn with_id(
        id: impl Into<NoteId>,
        folder_id: impl Into<FolderId>,
        content: impl Into<String>,
        user_id: UserId,
    ) -> Self {
        let content = content.into();
        let stamped = now();
        Self {
            id: id.into(),
            folder_id: folder_id.into(),
            user_id,
            size: content_size(&content),
            content,
            is_deleted: false,
            created_at: stamped,
            updated_at: stamped,
        }
    }

    /// Replaces content and recomputes the derived size.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.size = content_size(&self.content);
        self.touch();
    }

    /// Moves this note into the recycle bin.
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
        self.touch();
    }

    /// Takes this note back out of the recycle bin.
    pub fn restore(&mut self) {
        self.is_deleted = false;
        self.touch();
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = now();
    }
}

/// Note as found on disk, with the fields older files may lack.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredNote {
    id: NoteId,
    folder_id: FolderId,
    #[serde(default)]
    user_id: Option<UserId>,
    content: String,
    #[serde(default)]
    is_deleted: bool,
    #[serde(default)]
    created_at: Option<Timestamp>,
    #[serde(default)]
    updated_at: Option<Timestamp>,
}

impl From<StoredNote> for Note {
    fn from(stored: StoredNote) -> Self {
        let created_at = stored
            .created_at
            .or(stored.updated_at)
            .unwrap_or_else(now);
        Self {
            id: stored.id,
            folder_id: stored.folder_id,
            user_id: stored.user_id.unwrap_or(DEFAULT_USER_ID),
            size: content_size(&stored.content),
            content: stored.content,
            is_deleted: stored.is_deleted,
            created_at,
            updated_at: stored.updated_at.unwrap_or(created_at),
        }
    }
}

/// Size of note content, counted in chars.
pub fn content_size(content: &str) -> usize {
    content.chars().count()
}
