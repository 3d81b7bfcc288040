//! Folder record and derived tree read model.
//!
//! # Invariants
//! - `parent_folder_id == None` marks a root folder.
//! - `parent_folder_id` serializes as explicit `null`, never omitted.
//! - `FolderTree` is built on read and never persisted.

use super::{new_record_id, now, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Stable folder identifier.
pub type FolderId = String;

/// Persisted folder record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    /// Parent folder id. `None` means root-level folder.
    pub parent_folder_id: Option<FolderId>,
    pub user_id: UserId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Folder {
    /// Creates a folder with a generated id and both timestamps set to now.
    pub fn new(
        parent_folder_id: Option<FolderId>,
        name: impl Into<String>,
        user_id: UserId,
    ) -> Self {
        Self::with_id(new_record_id(), parent_folder_id, name, user_id)
    }

    /// Creates a folder with a caller-provided id.
    ///
    /// Used by import paths and fixtures where identity already exists.
    pub fn with_id(
        id: impl Into<FolderId>,
        parent_folder_id: Option<FolderId>,
        name: impl Into<String>,
        user_id: UserId,
    ) -> Self {
        let stamped = now();
        Self {
            id: id.into(),
            name: name.into(),
            parent_folder_id,
            user_id,
            created_at: stamped,
            updated_at: stamped,
        }
    }

    /// Returns whether this folder sits at the top of the hierarchy.
    pub fn is_root(&self) -> bool {
        self.parent_folder_id.is_none()
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = now();
    }
}

/// Folder decorated with its nested children.
///
/// Serializes as the folder's own fields plus a `children` array.
/// Construction, traversal and drop do not recurse; serialization does, and
/// stays shallow because services cap nesting at `MAX_FOLDER_DEPTH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderTree {
    #[serde(flatten)]
    pub folder: Folder,
    pub children: Vec<FolderTree>,
}

impl FolderTree {
    /// Counts this node and every descendant.
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Depth-first pre-order walk over this node and its descendants.
    pub fn iter(&self) -> impl Iterator<Item = &Folder> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(&node.folder)
        })
    }
}

impl Drop for FolderTree {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}
