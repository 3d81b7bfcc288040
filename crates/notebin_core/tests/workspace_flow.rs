use notebin_core::{
    ErrorKind, FolderDeleteMode, StorageBackend, Workspace, WorkspaceConfig, WorkspaceError,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

#[test]
fn notes_require_an_existing_folder() {
    let workspace = Workspace::in_memory();

    let err = workspace.create_note("missing", "body").unwrap_err();
    assert!(matches!(&err, WorkspaceError::FolderNotFound(id) if id == "missing"));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let folder = workspace.create_folder(None, "Inbox").unwrap();
    let note = workspace.create_note(&folder.id, "body").unwrap();
    assert_eq!(workspace.notes_in_folder(&folder.id).unwrap(), vec![note.clone()]);

    let err = workspace.move_note(&note.id, "missing").unwrap_err();
    assert!(matches!(err, WorkspaceError::FolderNotFound(_)));
    assert_eq!(workspace.get_note(&note.id).unwrap().unwrap().folder_id, folder.id);
}

#[test]
fn move_note_between_folders() {
    let workspace = Workspace::in_memory();
    let inbox = workspace.create_folder(None, "Inbox").unwrap();
    let archive = workspace.create_folder(None, "Archive").unwrap();
    let note = workspace.create_note(&inbox.id, "body").unwrap();

    let moved = workspace.move_note(&note.id, &archive.id).unwrap();
    assert_eq!(moved.folder_id, archive.id);
    assert!(workspace.notes_in_folder(&inbox.id).unwrap().is_empty());
}

#[test]
fn cascade_delete_sends_notes_of_the_subtree_to_the_bin() {
    let workspace = Workspace::in_memory();
    let root = workspace.create_folder(None, "Root").unwrap();
    let child = workspace.create_folder(Some(root.id.as_str()), "Child").unwrap();
    let other = workspace.create_folder(None, "Other").unwrap();
    let in_root = workspace.create_note(&root.id, "root note").unwrap();
    let in_child = workspace.create_note(&child.id, "child note").unwrap();
    let kept = workspace.create_note(&other.id, "other note").unwrap();

    let deletion = workspace
        .delete_folder(&root.id, FolderDeleteMode::Cascade)
        .unwrap()
        .unwrap();
    assert_eq!(deletion.folders.removed.len(), 2);

    let deleted: HashSet<String> = deletion.notes_deleted.into_iter().collect();
    assert_eq!(deleted, HashSet::from([in_root.id, in_child.id]));
    assert!(deletion.notes_moved.is_empty());

    assert_eq!(workspace.recycle_bin().unwrap().len(), 2);
    assert!(workspace.get_note(&kept.id).unwrap().unwrap().is_active());
    assert_eq!(workspace.folder_tree(None).unwrap().len(), 1);
}

#[test]
fn dissolve_delete_moves_notes_to_the_parent() {
    let workspace = Workspace::in_memory();
    let root = workspace.create_folder(None, "Root").unwrap();
    let middle = workspace.create_folder(Some(root.id.as_str()), "Middle").unwrap();
    let leaf = workspace.create_folder(Some(middle.id.as_str()), "Leaf").unwrap();
    let note = workspace.create_note(&middle.id, "body").unwrap();

    let deletion = workspace
        .delete_folder(&middle.id, FolderDeleteMode::Dissolve)
        .unwrap()
        .unwrap();
    assert_eq!(deletion.notes_moved, vec![note.id.clone()]);
    assert!(deletion.notes_deleted.is_empty());

    assert_eq!(workspace.get_note(&note.id).unwrap().unwrap().folder_id, root.id);
    let leaf = workspace.get_folder(&leaf.id).unwrap().unwrap();
    assert_eq!(leaf.parent_folder_id.as_deref(), Some(root.id.as_str()));
}

#[test]
fn dissolving_a_root_folder_bins_its_notes() {
    let workspace = Workspace::in_memory();
    let root = workspace.create_folder(None, "Root").unwrap();
    let note = workspace.create_note(&root.id, "body").unwrap();

    let deletion = workspace
        .delete_folder(&root.id, FolderDeleteMode::Dissolve)
        .unwrap()
        .unwrap();
    assert_eq!(deletion.notes_deleted, vec![note.id.clone()]);
    assert!(workspace.get_note(&note.id).unwrap().unwrap().is_deleted);
}

#[test]
fn orphan_delete_leaves_notes_untouched() {
    let workspace = Workspace::in_memory();
    let root = workspace.create_folder(None, "Root").unwrap();
    let note = workspace.create_note(&root.id, "body").unwrap();

    let deletion = workspace
        .delete_folder(&root.id, FolderDeleteMode::Orphan)
        .unwrap()
        .unwrap();
    assert!(deletion.notes_deleted.is_empty());
    assert!(deletion.notes_moved.is_empty());
    assert!(workspace.get_note(&note.id).unwrap().unwrap().is_active());
}

#[test]
fn deleting_unknown_folder_returns_none() {
    let workspace = Workspace::in_memory();
    assert!(workspace
        .delete_folder("missing", FolderDeleteMode::Cascade)
        .unwrap()
        .is_none());
}

#[test]
fn restore_requires_the_original_folder() {
    let workspace = Workspace::in_memory();
    let keep = workspace.create_folder(None, "Keep").unwrap();
    let drop_me = workspace.create_folder(None, "Drop").unwrap();
    let survivor = workspace.create_note(&keep.id, "survivor").unwrap();
    let stranded = workspace.create_note(&drop_me.id, "stranded").unwrap();

    workspace.delete_note(&survivor.id).unwrap();
    workspace
        .delete_folder(&drop_me.id, FolderDeleteMode::Cascade)
        .unwrap();

    let restored = workspace.restore_note(&survivor.id).unwrap();
    assert!(restored.is_active());

    let err = workspace.restore_note(&stranded.id).unwrap_err();
    assert!(matches!(&err, WorkspaceError::FolderNotFound(id) if *id == drop_me.id));
    assert!(workspace.get_note(&stranded.id).unwrap().unwrap().is_deleted);

    let err = workspace.restore_note("missing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn cascade_deleted_notes_can_be_restored_into_another_folder() {
    let workspace = Workspace::in_memory();
    let keep = workspace.create_folder(None, "Keep").unwrap();
    let drop_me = workspace.create_folder(None, "Drop").unwrap();
    let stranded = workspace.create_note(&drop_me.id, "stranded").unwrap();

    workspace
        .delete_folder(&drop_me.id, FolderDeleteMode::Cascade)
        .unwrap();
    assert_eq!(workspace.recycle_bin().unwrap().len(), 1);

    let err = workspace
        .restore_note_into(&stranded.id, &drop_me.id)
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::FolderNotFound(_)));

    let restored = workspace.restore_note_into(&stranded.id, &keep.id).unwrap();
    assert!(restored.is_active());
    assert_eq!(restored.folder_id, keep.id);
    assert_eq!(restored.content, "stranded");
    assert!(workspace.recycle_bin().unwrap().is_empty());
    assert_eq!(workspace.notes_in_folder(&keep.id).unwrap(), vec![restored]);
}

#[test]
fn notes_never_survive_in_a_folder_deleted_concurrently() {
    for _ in 0..10 {
        let workspace = Arc::new(Workspace::in_memory());
        let doomed = workspace.create_folder(None, "Doomed").unwrap();

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let workspace = Arc::clone(&workspace);
                let folder_id = doomed.id.clone();
                thread::spawn(move || {
                    for _ in 0..20 {
                        match workspace.create_note(&folder_id, "body") {
                            Ok(_) | Err(WorkspaceError::FolderNotFound(_)) => {}
                            Err(other) => panic!("unexpected error: {other}"),
                        }
                    }
                })
            })
            .collect();
        let deleter = {
            let workspace = Arc::clone(&workspace);
            let folder_id = doomed.id.clone();
            thread::spawn(move || {
                workspace
                    .delete_folder(&folder_id, FolderDeleteMode::Cascade)
                    .unwrap();
            })
        };
        for handle in writers {
            handle.join().unwrap();
        }
        deleter.join().unwrap();

        assert!(workspace.get_folder(&doomed.id).unwrap().is_none());
        assert!(workspace.notes_in_folder(&doomed.id).unwrap().is_empty());
    }
}

#[test]
fn concurrent_creates_are_not_lost() {
    let workspace = Arc::new(Workspace::in_memory());
    let root = workspace.create_folder(None, "Root").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let workspace = Arc::clone(&workspace);
            let root_id = root.id.clone();
            thread::spawn(move || {
                for index in 0..25 {
                    let folder = workspace
                        .create_folder(Some(root_id.as_str()), format!("w{worker}-{index}"))
                        .unwrap();
                    workspace.create_note(&folder.id, "body").unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let tree = workspace.folder_tree(None).unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].children.len(), 200);
    assert_eq!(workspace.folders().list_folders().unwrap().len(), 201);
    let notes: usize = tree[0]
        .children
        .iter()
        .map(|child| workspace.notes_in_folder(&child.folder.id).unwrap().len())
        .sum();
    assert_eq!(notes, 200);
}

#[test]
fn json_workspace_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = WorkspaceConfig::new(dir.path().join("data"));

    let (folder_id, note_id) = {
        let workspace = Workspace::open(&config).unwrap();
        let folder = workspace.create_folder(None, "Persisted").unwrap();
        let note = workspace.create_note(&folder.id, "kept").unwrap();
        (folder.id, note.id)
    };
    assert!(config.folders_path().exists());
    assert!(config.notes_path().exists());

    let reopened = Workspace::open(&config).unwrap();
    assert_eq!(reopened.get_folder(&folder_id).unwrap().unwrap().name, "Persisted");
    assert_eq!(reopened.get_note(&note_id).unwrap().unwrap().content, "kept");
}

#[test]
fn sqlite_workspace_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = WorkspaceConfig::new(dir.path()).with_backend(StorageBackend::Sqlite);

    let folder_id = {
        let workspace = Workspace::open(&config).unwrap();
        let root = workspace.create_folder(None, "Root").unwrap();
        workspace.create_folder(Some(root.id.as_str()), "Child").unwrap();
        root.id
    };
    assert!(config.sqlite_path().exists());

    let reopened = Workspace::open(&config).unwrap();
    let tree = reopened.folder_tree(None).unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].folder.id, folder_id);
    assert_eq!(tree[0].children[0].folder.name, "Child");
}
