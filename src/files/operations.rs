//! Workspace file operations.
//!
//! The core behind the UI's file endpoints: read, write, create, rename,
//! delete. Every operation takes a boundary-relative path and goes through
//! confinement before touching the filesystem. Request shapes are explicit
//! structs, deserialized and validated before this module is reached, so the
//! confiner always receives a real string.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::sandbox::confine;

/// Kind of entry to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// Body of a create request.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub path: String,
    pub kind: EntryKind,
}

/// Body of a rename request.
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub from: String,
    pub to: String,
}

/// Body of a delete request. The path may also arrive as a query parameter;
/// see [`delete_request_path`].
#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    pub path: Option<String>,
}

/// Merges the two places a delete path may arrive from, body taking
/// precedence over the query string.
pub fn delete_request_path(body: &DeleteRequest, query: Option<String>) -> Option<String> {
    body.path.clone().or(query)
}

fn confined(root: &Path, relative: &str) -> Result<PathBuf, StorageError> {
    Ok(confine(root, relative)?)
}

/// Reads a file's contents.
pub fn read_file(root: &Path, relative: &str) -> Result<Vec<u8>, StorageError> {
    let path = confined(root, relative)?;
    if !path.exists() {
        return Err(StorageError::NotFound(relative.to_string()));
    }
    if !path.is_file() {
        return Err(StorageError::NotAFile(relative.to_string()));
    }
    Ok(fs::read(&path)?)
}

/// Writes a file, creating it or truncating an existing one. The parent
/// directory must already exist; directories are created explicitly, not as
/// a write side effect.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> Result<(), StorageError> {
    let path = confined(root, relative)?;
    if path.is_dir() {
        return Err(StorageError::NotAFile(relative.to_string()));
    }
    if let Some(parent) = path.parent() {
        if !parent.is_dir() {
            return Err(StorageError::NotFound(relative.to_string()));
        }
    }
    fs::write(&path, contents)?;
    Ok(())
}

/// Creates a file or folder. Folders are created with missing ancestors;
/// files require their parent to exist.
pub fn create_entry(root: &Path, request: &CreateRequest) -> Result<(), StorageError> {
    let path = confined(root, &request.path)?;
    if path.exists() {
        return Err(StorageError::AlreadyExists(request.path.clone()));
    }

    match request.kind {
        EntryKind::Folder => {
            fs::create_dir_all(&path)?;
        }
        EntryKind::File => {
            if let Some(parent) = path.parent() {
                if !parent.is_dir() {
                    return Err(StorageError::NotFound(request.path.clone()));
                }
            }
            fs::File::create(&path)?;
        }
    }
    Ok(())
}

/// Renames an entry. Both endpoints are confined to the same boundary, so a
/// rename can never move content out of the workspace.
pub fn rename_entry(root: &Path, request: &RenameRequest) -> Result<(), StorageError> {
    let from = confined(root, &request.from)?;
    let to = confined(root, &request.to)?;

    if !from.exists() {
        return Err(StorageError::NotFound(request.from.clone()));
    }
    if to.exists() {
        return Err(StorageError::AlreadyExists(request.to.clone()));
    }

    fs::rename(&from, &to)?;
    Ok(())
}

/// Deletes a file or, recursively, a folder.
pub fn delete_entry(root: &Path, relative: &str) -> Result<(), StorageError> {
    let path = confined(root, relative)?;
    if path == root {
        // The boundary itself is not deletable through this endpoint.
        return Err(StorageError::InvalidPath(relative.to_string()));
    }
    if !path.exists() {
        return Err(StorageError::NotFound(relative.to_string()));
    }

    if path.is_dir() {
        fs::remove_dir_all(&path)?;
    } else {
        fs::remove_file(&path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();

        write_file(&root, "notes.md", b"hello").unwrap();
        assert_eq!(read_file(&root, "notes.md").unwrap(), b"hello");
    }

    #[test]
    fn write_into_missing_parent_is_not_found() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();

        assert!(matches!(
            write_file(&root, "missing/notes.md", b"x"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn every_operation_rejects_traversal() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let escape = "../outside.txt";

        assert!(matches!(
            read_file(&root, escape),
            Err(StorageError::Traversal(_))
        ));
        assert!(matches!(
            write_file(&root, escape, b"x"),
            Err(StorageError::Traversal(_))
        ));
        assert!(matches!(
            create_entry(
                &root,
                &CreateRequest {
                    path: escape.to_string(),
                    kind: EntryKind::File
                }
            ),
            Err(StorageError::Traversal(_))
        ));
        assert!(matches!(
            rename_entry(
                &root,
                &RenameRequest {
                    from: "a.txt".to_string(),
                    to: escape.to_string()
                }
            ),
            Err(StorageError::Traversal(_))
        ));
        assert!(matches!(
            delete_entry(&root, escape),
            Err(StorageError::Traversal(_))
        ));
    }

    #[test]
    fn create_folder_builds_missing_ancestors() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();

        create_entry(
            &root,
            &CreateRequest {
                path: "a/b/c".to_string(),
                kind: EntryKind::Folder,
            },
        )
        .unwrap();
        assert!(root.join("a/b/c").is_dir());
    }

    #[test]
    fn create_existing_entry_is_rejected() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        write_file(&root, "notes.md", b"x").unwrap();

        assert!(matches!(
            create_entry(
                &root,
                &CreateRequest {
                    path: "notes.md".to_string(),
                    kind: EntryKind::File
                }
            ),
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn rename_moves_within_the_boundary() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        write_file(&root, "old.md", b"x").unwrap();

        rename_entry(
            &root,
            &RenameRequest {
                from: "old.md".to_string(),
                to: "new.md".to_string(),
            },
        )
        .unwrap();
        assert!(!root.join("old.md").exists());
        assert!(root.join("new.md").is_file());
    }

    #[test]
    fn delete_removes_files_and_folders_recursively() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        create_entry(
            &root,
            &CreateRequest {
                path: "stack".to_string(),
                kind: EntryKind::Folder,
            },
        )
        .unwrap();
        write_file(&root, "stack/notes.md", b"x").unwrap();

        delete_entry(&root, "stack").unwrap();
        assert!(!root.join("stack").exists());
    }

    #[test]
    fn delete_of_the_boundary_itself_is_rejected() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();

        assert!(matches!(
            delete_entry(&root, ""),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn delete_path_prefers_body_over_query() {
        let body = DeleteRequest {
            path: Some("from-body.md".to_string()),
        };
        assert_eq!(
            delete_request_path(&body, Some("from-query.md".to_string())),
            Some("from-body.md".to_string())
        );

        let empty = DeleteRequest::default();
        assert_eq!(
            delete_request_path(&empty, Some("from-query.md".to_string())),
            Some("from-query.md".to_string())
        );
        assert_eq!(delete_request_path(&empty, None), None);
    }
}
