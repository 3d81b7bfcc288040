//! Workspace facade over the folder and note collections.
//!
//! # Responsibility
//! - Open the configured backend for both collections.
//! - Check folder references before note create/move/restore.
//! - Carry folder delete policies over to the notes they contain.
//!
//! # Invariants
//! - Notes are only created in, moved to, or restored into existing folders.
//!   The folder collection stays locked from the existence check until the
//!   note write finishes, so a concurrent folder delete lands before or after.
//! - A folder delete touches folders first, then notes; the two collections
//!   are written separately, so a note-side failure leaves notes pointing
//!   at removed folders until retried.
//! - Lock order is folders, then notes.

use crate::config::{StorageBackend, WorkspaceConfig};
use crate::model::folder::{Folder, FolderId, FolderTree};
use crate::model::note::{Note, NoteId};
use crate::model::{UserId, DEFAULT_USER_ID};
use crate::service::folder_service::{
    FolderDeleteMode, FolderDeletion, FolderService, FolderServiceError, FOLDERS_COLLECTION,
};
use crate::service::note_service::{NoteService, NoteServiceError, NOTES_COLLECTION};
use crate::service::ErrorKind;
use crate::store::{CollectionStore, JsonFileStore, MemoryStore, SqliteHandle, StoreError};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DynFolderStore = Box<dyn CollectionStore<Folder>>;
pub type DynNoteStore = Box<dyn CollectionStore<Note>>;

/// Errors from workspace operations.
#[derive(Debug)]
pub enum WorkspaceError {
    /// Referenced folder does not exist.
    FolderNotFound(FolderId),
    Folder(FolderServiceError),
    Note(NoteServiceError),
    /// Backend could not be opened.
    Storage(StoreError),
}

impl WorkspaceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FolderNotFound(_) => ErrorKind::NotFound,
            Self::Folder(err) => err.kind(),
            Self::Note(err) => err.kind(),
            Self::Storage(_) => ErrorKind::StorageUnavailable,
        }
    }
}

impl Display for WorkspaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::Folder(err) => write!(f, "{err}"),
            Self::Note(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::FolderNotFound(_) => None,
            Self::Folder(err) => Some(err),
            Self::Note(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<FolderServiceError> for WorkspaceError {
    fn from(value: FolderServiceError) -> Self {
        Self::Folder(value)
    }
}

impl From<NoteServiceError> for WorkspaceError {
    fn from(value: NoteServiceError) -> Self {
        Self::Note(value)
    }
}

impl From<StoreError> for WorkspaceError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value)
    }
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Folder delete plus the note changes it caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceDeletion {
    pub folders: FolderDeletion,
    /// Notes moved to the recycle bin.
    pub notes_deleted: Vec<NoteId>,
    /// Notes moved to the deleted folder's parent.
    pub notes_moved: Vec<NoteId>,
}

pub struct Workspace<F: CollectionStore<Folder>, N: CollectionStore<Note>> {
    folders: FolderService<F>,
    notes: NoteService<N>,
}

impl Workspace<DynFolderStore, DynNoteStore> {
    /// Opens the configured backend under `config.data_dir`.
    pub fn open(config: &WorkspaceConfig) -> WorkspaceResult<Self> {
        std::fs::create_dir_all(&config.data_dir).map_err(|source| StoreError::Io {
            path: config.data_dir.clone(),
            source,
        })?;

        let (folders, notes): (DynFolderStore, DynNoteStore) = match config.backend {
            StorageBackend::JsonFiles => (
                Box::new(JsonFileStore::new(config.folders_path())),
                Box::new(JsonFileStore::new(config.notes_path())),
            ),
            StorageBackend::Sqlite => {
                let handle = SqliteHandle::open(config.sqlite_path())?;
                (
                    Box::new(handle.collection(FOLDERS_COLLECTION)),
                    Box::new(handle.collection(NOTES_COLLECTION)),
                )
            }
        };

        info!(
            "event=workspace_open module=workspace status=ok backend={:?}",
            config.backend
        );
        Ok(Self::new(folders, notes))
    }
}

impl Workspace<MemoryStore<Folder>, MemoryStore<Note>> {
    /// Empty workspace held in memory.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new(), MemoryStore::new())
    }
}

impl<F: CollectionStore<Folder>, N: CollectionStore<Note>> Workspace<F, N> {
    pub fn new(folder_store: F, note_store: N) -> Self {
        Self {
            folders: FolderService::new(folder_store),
            notes: NoteService::new(note_store),
        }
    }

    pub fn folders(&self) -> &FolderService<F> {
        &self.folders
    }

    pub fn notes(&self) -> &NoteService<N> {
        &self.notes
    }

    pub fn folder_tree(&self, user_id: Option<UserId>) -> WorkspaceResult<Vec<FolderTree>> {
        Ok(self.folders.get_tree(user_id)?)
    }

    pub fn get_folder(&self, folder_id: &str) -> WorkspaceResult<Option<Folder>> {
        Ok(self.folders.get_folder(folder_id)?)
    }

    pub fn create_folder(
        &self,
        parent_folder_id: Option<&str>,
        name: impl Into<String>,
    ) -> WorkspaceResult<Folder> {
        Ok(self.folders.create_folder(parent_folder_id, name)?)
    }

    pub fn rename_folder(&self, folder_id: &str, name: impl Into<String>) -> WorkspaceResult<Folder> {
        Ok(self.folders.rename_folder(folder_id, name)?)
    }

    pub fn move_folder(
        &self,
        folder_id: &str,
        target_folder_id: Option<&str>,
    ) -> WorkspaceResult<Folder> {
        Ok(self.folders.move_folder(folder_id, target_folder_id)?)
    }

    /// Deletes a folder and applies `mode` to the notes it held.
    ///
    /// Returns `None` when the folder does not exist.
    pub fn delete_folder(
        &self,
        folder_id: &str,
        mode: FolderDeleteMode,
    ) -> WorkspaceResult<Option<WorkspaceDeletion>> {
        let Some(folders) = self.folders.delete_folder_with(folder_id, mode)? else {
            return Ok(None);
        };

        let note_changes = match (mode, folders.former_parent_id.as_deref()) {
            (FolderDeleteMode::Orphan, _) => Ok((Vec::new(), Vec::new())),
            (FolderDeleteMode::Dissolve, Some(parent_id)) => self
                .notes
                .reassign_folder(&folders.folder_id, parent_id)
                .map(|moved| (Vec::new(), moved)),
            (FolderDeleteMode::Dissolve, None) | (FolderDeleteMode::Cascade, _) => self
                .notes
                .soft_delete_in_folders(&folders.removed)
                .map(|deleted| (deleted, Vec::new())),
        };
        let (notes_deleted, notes_moved) = note_changes.map_err(|err| {
            error!(
                "event=folder_delete_notes module=workspace status=error folder_id={} error={}",
                folders.folder_id, err
            );
            err
        })?;

        Ok(Some(WorkspaceDeletion {
            folders,
            notes_deleted,
            notes_moved,
        }))
    }

    pub fn notes_in_folder(&self, folder_id: &str) -> WorkspaceResult<Vec<Note>> {
        Ok(self.notes.list_in_folder(folder_id)?)
    }

    pub fn get_note(&self, note_id: &str) -> WorkspaceResult<Option<Note>> {
        Ok(self.notes.get_note(note_id)?)
    }

    /// Creates a note owned by the default user in an existing folder.
    pub fn create_note(&self, folder_id: &str, content: impl Into<String>) -> WorkspaceResult<Note> {
        self.create_note_for(DEFAULT_USER_ID, folder_id, content)
    }

    pub fn create_note_for(
        &self,
        user_id: UserId,
        folder_id: &str,
        content: impl Into<String>,
    ) -> WorkspaceResult<Note> {
        let content = content.into();
        self.in_folder(folder_id, || {
            Ok(self.notes.create_note_for(user_id, folder_id, content)?)
        })
    }

    pub fn update_note(&self, note_id: &str, content: impl Into<String>) -> WorkspaceResult<Note> {
        Ok(self.notes.update_note(note_id, content)?)
    }

    pub fn delete_note(&self, note_id: &str) -> WorkspaceResult<bool> {
        Ok(self.notes.delete_note(note_id)?)
    }

    /// Moves a note into an existing folder.
    pub fn move_note(&self, note_id: &str, target_folder_id: &str) -> WorkspaceResult<Note> {
        self.in_folder(target_folder_id, || {
            Ok(self.notes.move_note(note_id, target_folder_id)?)
        })
    }

    pub fn recycle_bin(&self) -> WorkspaceResult<Vec<Note>> {
        Ok(self.notes.list_deleted()?)
    }

    /// Restores a note whose folder still exists.
    ///
    /// Notes whose folder was deleted fail with `FolderNotFound`; recover
    /// them with [`Workspace::restore_note_into`].
    pub fn restore_note(&self, note_id: &str) -> WorkspaceResult<Note> {
        let note = self
            .notes
            .get_note(note_id)?
            .ok_or_else(|| NoteServiceError::NoteNotFound(note_id.to_string()))?;
        self.in_folder(&note.folder_id, || Ok(self.notes.restore_note(note_id)?))
    }

    /// Restores a note into an existing folder, whatever folder it was
    /// deleted from.
    pub fn restore_note_into(
        &self,
        note_id: &str,
        target_folder_id: &str,
    ) -> WorkspaceResult<Note> {
        self.in_folder(target_folder_id, || {
            Ok(self.notes.restore_note_into(note_id, target_folder_id)?)
        })
    }

    /// Runs `action` while `folder_id` is guaranteed to exist.
    fn in_folder<R>(
        &self,
        folder_id: &str,
        action: impl FnOnce() -> WorkspaceResult<R>,
    ) -> WorkspaceResult<R> {
        self.folders
            .with_folder(folder_id, |_| action())?
            .unwrap_or_else(|| Err(WorkspaceError::FolderNotFound(folder_id.to_string())))
    }
}
