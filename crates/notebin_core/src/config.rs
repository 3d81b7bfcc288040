//! Workspace configuration.
//!
//! # Invariants
//! - All collections of one workspace live under one `data_dir`.
//! - File names are fixed so a data directory can be reopened by any build.

use crate::logging::default_log_level;
use std::path::{Path, PathBuf};

pub const FOLDERS_FILE_NAME: &str = "folders.json";
pub const NOTES_FILE_NAME: &str = "notes.json";
pub const SQLITE_FILE_NAME: &str = "notebin.sqlite3";
pub const LOG_DIR_NAME: &str = "logs";

/// Persistence backend for a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// One JSON array file per collection.
    #[default]
    JsonFiles,
    /// One SQLite database holding every collection.
    Sqlite,
}

impl StorageBackend {
    /// Parses `json` or `sqlite` (case-insensitive).
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" | "json_files" => Ok(Self::JsonFiles),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!(
                "unsupported storage backend `{other}`; expected json|sqlite"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceConfig {
    pub data_dir: PathBuf,
    pub backend: StorageBackend,
    pub log_level: String,
}

impl WorkspaceConfig {
    /// JSON backend and the build-mode default log level.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            backend: StorageBackend::default(),
            log_level: default_log_level().to_string(),
        }
    }

    pub fn with_backend(mut self, backend: StorageBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn folders_path(&self) -> PathBuf {
        self.data_dir.join(FOLDERS_FILE_NAME)
    }

    pub fn notes_path(&self) -> PathBuf {
        self.data_dir.join(NOTES_FILE_NAME)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join(SQLITE_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join(LOG_DIR_NAME)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
