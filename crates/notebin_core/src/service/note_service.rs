//! Note service with recycle-bin semantics.
//!
//! # Responsibility
//! - Create, update, move, soft-delete and restore note records.
//! - Keep the derived `size` in step with `content`.
//!
//! # Invariants
//! - Notes are never removed from the collection.
//! - Folder listings exclude deleted notes; the recycle bin lists only them.
//! - Target folders are not validated here; see `Workspace`.

use super::ErrorKind;
use crate::model::folder::FolderId;
use crate::model::note::{Note, NoteId};
use crate::model::{UserId, DEFAULT_USER_ID};
use crate::store::{Collection, CollectionStore, Outcome, StoreError};
use log::info;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Collection name used by every note backend.
pub const NOTES_COLLECTION: &str = "notes";

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Note collection could not be read or written.
    Storage(StoreError),
}

impl NoteServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoteNotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::StorageUnavailable,
        }
    }
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::NoteNotFound(_) => None,
        }
    }
}

impl From<StoreError> for NoteServiceError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value)
    }
}

pub type NoteResult<T> = Result<T, NoteServiceError>;

/// Note service over one note collection.
pub struct NoteService<S: CollectionStore<Note>> {
    notes: Collection<Note, S>,
}

impl<S: CollectionStore<Note>> NoteService<S> {
    pub fn new(store: S) -> Self {
        Self {
            notes: Collection::new(NOTES_COLLECTION, store),
        }
    }

    /// Lists active notes in one folder, in storage order.
    pub fn list_in_folder(&self, folder_id: &str) -> NoteResult<Vec<Note>> {
        Ok(self
            .notes
            .read()?
            .into_iter()
            .filter(|note| note.folder_id == folder_id && note.is_active())
            .collect())
    }

    /// Gets one note by id, deleted or not.
    pub fn get_note(&self, note_id: &str) -> NoteResult<Option<Note>> {
        Ok(self.notes.read()?.into_iter().find(|note| note.id == note_id))
    }

    /// Lists the recycle bin in storage order.
    pub fn list_deleted(&self) -> NoteResult<Vec<Note>> {
        Ok(self
            .notes
            .read()?
            .into_iter()
            .filter(|note| note.is_deleted)
            .collect())
    }

    /// Creates a note owned by the default user.
    pub fn create_note(&self, folder_id: &str, content: impl Into<String>) -> NoteResult<Note> {
        self.create_note_for(DEFAULT_USER_ID, folder_id, content)
    }

    pub fn create_note_for(
        &self,
        user_id: UserId,
        folder_id: &str,
        content: impl Into<String>,
    ) -> NoteResult<Note> {
        let note = Note::new(folder_id, content, user_id);
        let created = self.notes.mutate(|notes| {
            notes.push(note.clone());
            Ok::<_, NoteServiceError>(Outcome::Changed(note))
        })?;

        info!(
            "event=note_create module=note status=ok note_id={} size={}",
            created.id, created.size
        );
        Ok(created)
    }

    /// Replaces note content fully and recomputes its size.
    pub fn update_note(&self, note_id: &str, content: impl Into<String>) -> NoteResult<Note> {
        let content = content.into();
        let updated = self.mutate_one(note_id, |note| {
            note.set_content(content);
            true
        })?;

        info!(
            "event=note_update module=note status=ok note_id={} size={}",
            updated.id, updated.size
        );
        Ok(updated)
    }

    /// Moves a note into the recycle bin. Returns `false` when not found.
    ///
    /// Deleting an already deleted note succeeds without writing.
    pub fn delete_note(&self, note_id: &str) -> NoteResult<bool> {
        let found = self.notes.mutate(|notes| {
            Ok::<_, NoteServiceError>(match notes.iter_mut().find(|note| note.id == note_id) {
                None => Outcome::Unchanged(false),
                Some(note) if note.is_deleted => Outcome::Unchanged(true),
                Some(note) => {
                    note.soft_delete();
                    Outcome::Changed(true)
                }
            })
        })?;

        info!(
            "event=note_delete module=note status={} note_id={note_id}",
            if found { "ok" } else { "not_found" }
        );
        Ok(found)
    }

    /// Reassigns a note to another folder.
    pub fn move_note(&self, note_id: &str, target_folder_id: &str) -> NoteResult<Note> {
        let moved = self.mutate_one(note_id, |note| {
            if note.folder_id == target_folder_id {
                return false;
            }
            note.folder_id = target_folder_id.to_string();
            note.touch();
            true
        })?;

        info!(
            "event=note_move module=note status=ok note_id={}",
            moved.id
        );
        Ok(moved)
    }

    /// Takes a note out of the recycle bin.
    pub fn restore_note(&self, note_id: &str) -> NoteResult<Note> {
        let restored = self.mutate_one(note_id, |note| {
            if note.is_active() {
                return false;
            }
            note.restore();
            true
        })?;

        info!(
            "event=note_restore module=note status=ok note_id={}",
            restored.id
        );
        Ok(restored)
    }

    /// Takes a note out of the recycle bin and places it in `target_folder_id`.
    pub fn restore_note_into(&self, note_id: &str, target_folder_id: &str) -> NoteResult<Note> {
        let restored = self.mutate_one(note_id, |note| {
            if note.is_active() && note.folder_id == target_folder_id {
                return false;
            }
            note.folder_id = target_folder_id.to_string();
            note.restore();
            true
        })?;

        info!(
            "event=note_restore module=note status=ok note_id={} relocated=true",
            restored.id
        );
        Ok(restored)
    }

    /// Soft-deletes every active note in `folder_ids` in one write.
    ///
    /// Returns the ids of the notes that changed.
    pub fn soft_delete_in_folders(&self, folder_ids: &[FolderId]) -> NoteResult<Vec<NoteId>> {
        let folder_ids: HashSet<&str> = folder_ids.iter().map(String::as_str).collect();
        let deleted = self.notes.mutate(|notes| {
            let mut changed = Vec::new();
            for note in notes
                .iter_mut()
                .filter(|note| note.is_active() && folder_ids.contains(note.folder_id.as_str()))
            {
                note.soft_delete();
                changed.push(note.id.clone());
            }
            Ok::<_, NoteServiceError>(changed_outcome(changed))
        })?;

        info!(
            "event=note_bulk_delete module=note status=ok folders={} notes={}",
            folder_ids.len(),
            deleted.len()
        );
        Ok(deleted)
    }

    /// Moves every note of `from_folder_id`, deleted ones included, to
    /// `to_folder_id` in one write.
    pub fn reassign_folder(&self, from_folder_id: &str, to_folder_id: &str) -> NoteResult<Vec<NoteId>> {
        let moved = self.notes.mutate(|notes| {
            let mut changed = Vec::new();
            for note in notes
                .iter_mut()
                .filter(|note| note.folder_id == from_folder_id)
            {
                note.folder_id = to_folder_id.to_string();
                note.touch();
                changed.push(note.id.clone());
            }
            Ok::<_, NoteServiceError>(changed_outcome(changed))
        })?;

        info!(
            "event=note_reassign module=note status=ok notes={}",
            moved.len()
        );
        Ok(moved)
    }

    /// Applies `change` to one note; it returns whether anything changed.
    fn mutate_one(&self, note_id: &str, change: impl FnOnce(&mut Note) -> bool) -> NoteResult<Note> {
        self.notes.mutate(|notes| {
            let note = notes
                .iter_mut()
                .find(|note| note.id == note_id)
                .ok_or_else(|| NoteServiceError::NoteNotFound(note_id.to_string()))?;
            Ok(if change(&mut *note) {
                Outcome::Changed(note.clone())
            } else {
                Outcome::Unchanged(note.clone())
            })
        })
    }
}

fn changed_outcome(changed: Vec<NoteId>) -> Outcome<Vec<NoteId>> {
    if changed.is_empty() {
        Outcome::Unchanged(changed)
    } else {
        Outcome::Changed(changed)
    }
}
