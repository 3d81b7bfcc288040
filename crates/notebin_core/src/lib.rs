//! Core domain logic for notebin: a folder hierarchy holding notes, stored
//! as whole collections and reassembled into a tree on read.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod workspace;

pub use config::{StorageBackend, WorkspaceConfig};
pub use logging::{default_log_level, init_logging, init_logging_for, logging_status};
pub use model::folder::{Folder, FolderId, FolderTree};
pub use model::note::{Note, NoteId};
pub use model::{Timestamp, UserId, DEFAULT_USER_ID};
pub use service::folder_service::{
    build_forest, FolderDeleteMode, FolderDeletion, FolderResult, FolderService,
    FolderServiceError, MAX_FOLDER_DEPTH,
};
pub use service::note_service::{NoteResult, NoteService, NoteServiceError};
pub use service::ErrorKind;
pub use store::{
    Collection, CollectionStats, CollectionStore, JsonFileStore, MemoryStore, Outcome, Record,
    SqliteCollectionStore, SqliteHandle, StoreError, StoreResult,
};
pub use workspace::{Workspace, WorkspaceDeletion, WorkspaceError, WorkspaceResult};

/// Minimal health-check API for wiring probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
