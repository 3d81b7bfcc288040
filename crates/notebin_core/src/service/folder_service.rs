//! Folder hierarchy service.
//!
//! # Responsibility
//! - Create, rename, move and delete folder records.
//! - Assemble the nested folder forest from flat parent pointers.
//!
//! # Invariants
//! - A parent id, when set, must resolve to an existing folder.
//! - Moves must not create parent-child cycles.
//! - Roots and siblings keep storage (insertion) order in the forest.

use super::ErrorKind;
use crate::model::folder::{Folder, FolderId, FolderTree};
use crate::model::{UserId, DEFAULT_USER_ID};
use crate::store::{Collection, CollectionStore, Outcome, StoreError};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Collection name used by every folder backend.
pub const FOLDERS_COLLECTION: &str = "folders";

/// Deepest allowed nesting; a root folder sits at depth 1.
pub const MAX_FOLDER_DEPTH: usize = 256;

static CONTROL_CHAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Cc}").expect("valid control char regex"));

/// How a folder delete treats the folder's descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FolderDeleteMode {
    /// Remove the folder and every descendant folder.
    #[default]
    Cascade,
    /// Remove the folder only; direct children move up to its parent.
    Dissolve,
    /// Remove the folder record only and leave descendants orphaned.
    Orphan,
}

/// What a folder delete changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderDeletion {
    pub folder_id: FolderId,
    /// Parent of the deleted folder before the delete.
    pub former_parent_id: Option<FolderId>,
    /// Removed folder ids in storage order, including `folder_id`.
    pub removed: Vec<FolderId>,
    /// Folders whose parent pointer was rewritten.
    pub reparented: Vec<FolderId>,
}

/// Errors from folder service operations.
#[derive(Debug)]
pub enum FolderServiceError {
    /// Name is blank after trim or contains control characters.
    InvalidName(&'static str),
    /// Target folder does not exist.
    NotFound(FolderId),
    /// Parent or move target does not exist.
    InvalidParent(FolderId),
    /// Move would place a folder inside its own subtree.
    CycleDetected {
        folder_id: FolderId,
        parent_id: FolderId,
    },
    /// Create or move would nest deeper than [`MAX_FOLDER_DEPTH`] under this parent.
    DepthExceeded(FolderId),
    /// Folder collection could not be read or written.
    Storage(StoreError),
}

impl FolderServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidName(_)
            | Self::InvalidParent(_)
            | Self::CycleDetected { .. }
            | Self::DepthExceeded(_) => ErrorKind::InvalidInput,
            Self::Storage(_) => ErrorKind::StorageUnavailable,
        }
    }
}

impl Display for FolderServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(reason) => write!(f, "invalid folder name: {reason}"),
            Self::NotFound(id) => write!(f, "folder not found: {id}"),
            Self::InvalidParent(id) => write!(f, "parent folder with ID {id} does not exist"),
            Self::CycleDetected {
                folder_id,
                parent_id,
            } => write!(
                f,
                "move would create cycle: folder {folder_id} under parent {parent_id}"
            ),
            Self::DepthExceeded(parent_id) => write!(
                f,
                "folder under parent {parent_id} would exceed {MAX_FOLDER_DEPTH} nesting levels"
            ),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FolderServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for FolderServiceError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value)
    }
}

pub type FolderResult<T> = Result<T, FolderServiceError>;

/// Folder service over one folder collection.
pub struct FolderService<S: CollectionStore<Folder>> {
    folders: Collection<Folder, S>,
}

impl<S: CollectionStore<Folder>> FolderService<S> {
    pub fn new(store: S) -> Self {
        Self {
            folders: Collection::new(FOLDERS_COLLECTION, store),
        }
    }

    /// Builds the folder forest.
    ///
    /// `user_id = None` includes every folder; `Some(user)` keeps only that
    /// owner's folders. Folders whose parent does not resolve are omitted.
    pub fn get_tree(&self, user_id: Option<UserId>) -> FolderResult<Vec<FolderTree>> {
        let mut folders = self.folders.read()?;
        if let Some(user_id) = user_id {
            folders.retain(|folder| folder.user_id == user_id);
        }
        Ok(build_forest(folders))
    }

    /// Lists every folder in storage order.
    pub fn list_folders(&self) -> FolderResult<Vec<Folder>> {
        Ok(self.folders.read()?)
    }

    pub fn get_folder(&self, folder_id: &str) -> FolderResult<Option<Folder>> {
        Ok(self
            .folders
            .read()?
            .into_iter()
            .find(|folder| folder.id == folder_id))
    }

    /// Runs `action` on a folder while no other caller can change the
    /// folder collection. Returns `None` when the folder does not exist.
    pub fn with_folder<R>(
        &self,
        folder_id: &str,
        action: impl FnOnce(&Folder) -> R,
    ) -> FolderResult<Option<R>> {
        Ok(self.folders.read_with(|folders| {
            folders
                .iter()
                .find(|folder| folder.id == folder_id)
                .map(action)
        })?)
    }

    /// Returns the chain of folders from a root down to `folder_id`.
    ///
    /// Returns `None` when the folder is missing or its ancestry does not
    /// reach a root.
    pub fn path_to(&self, folder_id: &str) -> FolderResult<Option<Vec<Folder>>> {
        let folders = self.folders.read()?;
        let by_id: HashMap<&str, &Folder> = folders
            .iter()
            .map(|folder| (folder.id.as_str(), folder))
            .collect();

        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = Some(folder_id);
        while let Some(current) = cursor {
            if !visited.insert(current) {
                return Ok(None);
            }
            let Some(folder) = by_id.get(current) else {
                return Ok(None);
            };
            path.push((*folder).clone());
            cursor = folder.parent_folder_id.as_deref();
        }
        path.reverse();
        Ok(Some(path))
    }

    /// Creates a folder owned by the default user.
    pub fn create_folder(
        &self,
        parent_folder_id: Option<&str>,
        name: impl Into<String>,
    ) -> FolderResult<Folder> {
        self.create_folder_for(DEFAULT_USER_ID, parent_folder_id, name)
    }

    /// Creates a folder under an optional parent.
    pub fn create_folder_for(
        &self,
        user_id: UserId,
        parent_folder_id: Option<&str>,
        name: impl Into<String>,
    ) -> FolderResult<Folder> {
        let name = normalize_folder_name(name.into())?;
        let created = self.folders.mutate(|folders| {
            if let Some(parent_id) = parent_folder_id {
                if !contains(folders, parent_id) {
                    return Err(FolderServiceError::InvalidParent(parent_id.to_string()));
                }
                if depth_of(folders, parent_id) >= MAX_FOLDER_DEPTH {
                    return Err(FolderServiceError::DepthExceeded(parent_id.to_string()));
                }
            }
            let folder = Folder::new(parent_folder_id.map(str::to_string), name, user_id);
            folders.push(folder.clone());
            Ok(Outcome::Changed(folder))
        })?;

        info!(
            "event=folder_create module=folder status=ok folder_id={} has_parent={}",
            created.id,
            created.parent_folder_id.is_some()
        );
        Ok(created)
    }

    /// Moves a folder under `target_folder_id`, or to root when `None`.
    pub fn move_folder(
        &self,
        folder_id: &str,
        target_folder_id: Option<&str>,
    ) -> FolderResult<Folder> {
        let moved = self.folders.mutate(|folders| {
            let index = position(folders, folder_id)
                .ok_or_else(|| FolderServiceError::NotFound(folder_id.to_string()))?;

            if let Some(target_id) = target_folder_id {
                if !contains(folders, target_id) {
                    return Err(FolderServiceError::InvalidParent(target_id.to_string()));
                }
                if would_create_cycle(folders, folder_id, target_id) {
                    return Err(FolderServiceError::CycleDetected {
                        folder_id: folder_id.to_string(),
                        parent_id: target_id.to_string(),
                    });
                }
                if depth_of(folders, target_id) + subtree_height(folders, folder_id)
                    > MAX_FOLDER_DEPTH
                {
                    return Err(FolderServiceError::DepthExceeded(target_id.to_string()));
                }
            }

            let folder = &mut folders[index];
            folder.parent_folder_id = target_folder_id.map(str::to_string);
            folder.touch();
            Ok(Outcome::Changed(folder.clone()))
        })?;

        info!(
            "event=folder_move module=folder status=ok folder_id={} to_root={}",
            moved.id,
            moved.parent_folder_id.is_none()
        );
        Ok(moved)
    }

    pub fn rename_folder(&self, folder_id: &str, name: impl Into<String>) -> FolderResult<Folder> {
        let name = normalize_folder_name(name.into())?;
        let renamed = self.folders.mutate(|folders| {
            let folder = folders
                .iter_mut()
                .find(|folder| folder.id == folder_id)
                .ok_or_else(|| FolderServiceError::NotFound(folder_id.to_string()))?;
            folder.name = name;
            folder.touch();
            Ok::<_, FolderServiceError>(Outcome::Changed(folder.clone()))
        })?;

        info!(
            "event=folder_rename module=folder status=ok folder_id={}",
            renamed.id
        );
        Ok(renamed)
    }

    /// Deletes a folder and its subtree. Returns `false` when not found.
    pub fn delete_folder(&self, folder_id: &str) -> FolderResult<bool> {
        Ok(self
            .delete_folder_with(folder_id, FolderDeleteMode::default())?
            .is_some())
    }

    /// Deletes a folder using `mode`. Returns `None` when not found.
    pub fn delete_folder_with(
        &self,
        folder_id: &str,
        mode: FolderDeleteMode,
    ) -> FolderResult<Option<FolderDeletion>> {
        let deletion = self.folders.mutate(|folders| {
            let Some(index) = position(folders, folder_id) else {
                return Ok::<_, FolderServiceError>(Outcome::Unchanged(None));
            };
            let deletion = match mode {
                FolderDeleteMode::Orphan => remove_single(folders, index, false),
                FolderDeleteMode::Dissolve => remove_single(folders, index, true),
                FolderDeleteMode::Cascade => remove_subtree(folders, index),
            };
            Ok(Outcome::Changed(Some(deletion)))
        })?;

        match &deletion {
            Some(deletion) => info!(
                "event=folder_delete module=folder status=ok folder_id={} mode={:?} removed={} reparented={}",
                deletion.folder_id,
                mode,
                deletion.removed.len(),
                deletion.reparented.len()
            ),
            None => info!(
                "event=folder_delete module=folder status=not_found folder_id={folder_id}"
            ),
        }
        Ok(deletion)
    }
}

/// Assembles the folder forest from flat records.
///
/// Runs in linear time over a parent index with an explicit stack, so
/// nesting depth is bounded by memory only. Each folder appears at most
/// once; folders unreachable from a root (dangling or cyclic parents) are
/// left out.
pub fn build_forest(folders: Vec<Folder>) -> Vec<FolderTree> {
    let mut roots = Vec::new();
    let mut children_of: HashMap<FolderId, Vec<Folder>> = HashMap::new();
    for folder in folders {
        match &folder.parent_folder_id {
            None => roots.push(folder),
            Some(parent_id) => children_of.entry(parent_id.clone()).or_default().push(folder),
        }
    }

    roots
        .into_iter()
        .filter_map(|root| assemble_tree(root, &mut children_of))
        .collect()
}

fn assemble_tree(
    root: Folder,
    children_of: &mut HashMap<FolderId, Vec<Folder>>,
) -> Option<FolderTree> {
    // Each frame is a node under construction and its children still to visit.
    let pending = take_children(children_of, &root.id);
    let mut stack = vec![(leaf(root), pending)];
    let mut finished = None;

    while let Some((_, pending)) = stack.last_mut() {
        if let Some(child) = pending.next() {
            let grandchildren = take_children(children_of, &child.id);
            stack.push((leaf(child), grandchildren));
            continue;
        }
        if let Some((done, _)) = stack.pop() {
            match stack.last_mut() {
                Some((parent, _)) => parent.children.push(done),
                None => finished = Some(done),
            }
        }
    }
    finished
}

fn take_children(
    children_of: &mut HashMap<FolderId, Vec<Folder>>,
    folder_id: &str,
) -> std::vec::IntoIter<Folder> {
    children_of.remove(folder_id).unwrap_or_default().into_iter()
}

fn leaf(folder: Folder) -> FolderTree {
    FolderTree {
        folder,
        children: Vec::new(),
    }
}

fn position(folders: &[Folder], folder_id: &str) -> Option<usize> {
    folders.iter().position(|folder| folder.id == folder_id)
}

fn contains(folders: &[Folder], folder_id: &str) -> bool {
    position(folders, folder_id).is_some()
}

fn would_create_cycle(folders: &[Folder], folder_id: &str, candidate_parent_id: &str) -> bool {
    let parents: HashMap<&str, Option<&str>> = folders
        .iter()
        .map(|folder| (folder.id.as_str(), folder.parent_folder_id.as_deref()))
        .collect();

    let mut visited = HashSet::new();
    let mut cursor = Some(candidate_parent_id);
    while let Some(current) = cursor {
        if current == folder_id || !visited.insert(current) {
            return true;
        }
        cursor = parents.get(current).copied().flatten();
    }
    false
}

/// Depth of `folder_id`, counting itself; a root is 1.
fn depth_of(folders: &[Folder], folder_id: &str) -> usize {
    let parents: HashMap<&str, Option<&str>> = folders
        .iter()
        .map(|folder| (folder.id.as_str(), folder.parent_folder_id.as_deref()))
        .collect();

    let mut visited = HashSet::new();
    let mut cursor = Some(folder_id);
    while let Some(current) = cursor {
        if !visited.insert(current) {
            break;
        }
        cursor = parents.get(current).copied().flatten();
    }
    visited.len()
}

/// Number of levels in the subtree rooted at `folder_id`, counting itself.
fn subtree_height(folders: &[Folder], folder_id: &str) -> usize {
    let mut children_of: HashMap<&str, Vec<&str>> = HashMap::new();
    for folder in folders {
        if let Some(parent_id) = folder.parent_folder_id.as_deref() {
            children_of.entry(parent_id).or_default().push(folder.id.as_str());
        }
    }

    let mut visited = HashSet::from([folder_id]);
    let mut level = vec![folder_id];
    let mut height = 0;
    while !level.is_empty() {
        height += 1;
        level = level
            .iter()
            .filter_map(|id| children_of.get(id))
            .flatten()
            .copied()
            .filter(|id| visited.insert(*id))
            .collect();
    }
    height
}

fn remove_single(folders: &mut Vec<Folder>, index: usize, reparent_children: bool) -> FolderDeletion {
    let removed = folders.remove(index);
    let mut reparented = Vec::new();
    if reparent_children {
        for child in folders
            .iter_mut()
            .filter(|folder| folder.parent_folder_id.as_deref() == Some(removed.id.as_str()))
        {
            child.parent_folder_id = removed.parent_folder_id.clone();
            child.touch();
            reparented.push(child.id.clone());
        }
    }

    FolderDeletion {
        former_parent_id: removed.parent_folder_id,
        removed: vec![removed.id.clone()],
        folder_id: removed.id,
        reparented,
    }
}

fn remove_subtree(folders: &mut Vec<Folder>, index: usize) -> FolderDeletion {
    let target = folders[index].clone();

    let mut subtree: HashSet<FolderId> = HashSet::from([target.id.clone()]);
    let mut frontier = vec![target.id.clone()];
    while let Some(parent_id) = frontier.pop() {
        for folder in folders.iter() {
            if folder.parent_folder_id.as_deref() == Some(parent_id.as_str())
                && subtree.insert(folder.id.clone())
            {
                frontier.push(folder.id.clone());
            }
        }
    }

    let removed = folders
        .iter()
        .filter(|folder| subtree.contains(&folder.id))
        .map(|folder| folder.id.clone())
        .collect();
    folders.retain(|folder| !subtree.contains(&folder.id));

    FolderDeletion {
        folder_id: target.id,
        former_parent_id: target.parent_folder_id,
        removed,
        reparented: Vec::new(),
    }
}

fn normalize_folder_name(value: String) -> FolderResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FolderServiceError::InvalidName("name must not be blank"));
    }
    if CONTROL_CHAR_RE.is_match(trimmed) {
        return Err(FolderServiceError::InvalidName(
            "name must not contain control characters",
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{build_forest, normalize_folder_name, would_create_cycle, FolderServiceError};
    use crate::model::folder::Folder;

    fn folder(id: &str, parent: Option<&str>) -> Folder {
        Folder::with_id(id, parent.map(str::to_string), id.to_uppercase(), 1)
    }

    #[test]
    fn forest_keeps_storage_order_for_roots_and_children() {
        let forest = build_forest(vec![
            folder("b", None),
            folder("b2", Some("b")),
            folder("a", None),
            folder("b1", Some("b")),
        ]);

        let roots: Vec<&str> = forest.iter().map(|node| node.folder.id.as_str()).collect();
        assert_eq!(roots, vec!["b", "a"]);
        let children: Vec<&str> = forest[0]
            .children
            .iter()
            .map(|node| node.folder.id.as_str())
            .collect();
        assert_eq!(children, vec!["b2", "b1"]);
    }

    #[test]
    fn forest_skips_dangling_and_cyclic_records() {
        let forest = build_forest(vec![
            folder("root", None),
            folder("lost", Some("missing")),
            folder("x", Some("y")),
            folder("y", Some("x")),
        ]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].node_count(), 1);
    }

    #[test]
    fn cycle_check_walks_ancestors_of_target() {
        let folders = vec![
            folder("a", None),
            folder("b", Some("a")),
            folder("c", Some("b")),
        ];
        assert!(would_create_cycle(&folders, "a", "c"));
        assert!(would_create_cycle(&folders, "b", "b"));
        assert!(!would_create_cycle(&folders, "c", "a"));
    }

    #[test]
    fn folder_names_are_trimmed_and_validated() {
        assert_eq!(normalize_folder_name("  Work ".to_string()).unwrap(), "Work");
        assert!(matches!(
            normalize_folder_name("   ".to_string()),
            Err(FolderServiceError::InvalidName(_))
        ));
        assert!(matches!(
            normalize_folder_name("line\nbreak".to_string()),
            Err(FolderServiceError::InvalidName(_))
        ));
        assert_eq!(normalize_folder_name("x".repeat(300)).unwrap().len(), 300);
    }
}
