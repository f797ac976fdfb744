//! Directory tree listing
//!
//! Builds the hierarchical file listing the workspace UI renders. The walk is
//! rooted at an already-confined directory; entries are filtered and ordered
//! here, confinement happened before the call.

use serde::Serialize;
use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::Path;

/// Kind of a tree entry. Folders order before files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    File,
}

/// One entry in the workspace tree, built fresh on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileNode {
    pub name: String,
    /// Boundary-relative path, `/`-separated.
    pub path: String,
    pub kind: NodeKind,
    pub children: Vec<FileNode>,
}

/// Names excluded from listings at every depth: the conventional hidden
/// marker and the dependency folder.
pub fn is_excluded(name: &str) -> bool {
    name == "node_modules" || name.starts_with('.')
}

/// Recursively lists `root`, which must already be confined by the caller.
///
/// Symlinks are not followed: a symlinked directory is reported as a file
/// node and never descended into, so filesystem cycles cannot recurse.
/// Any unreadable directory fails the whole call with the underlying error.
pub fn build_tree(root: &Path) -> io::Result<Vec<FileNode>> {
    walk(root, "")
}

fn walk(dir: &Path, prefix: &str) -> io::Result<Vec<FileNode>> {
    let mut nodes = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if is_excluded(&name) {
            continue;
        }

        // file_type() reports the symlink itself, not its target.
        let file_type = entry.file_type()?;
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };

        if file_type.is_dir() {
            let children = walk(&entry.path(), &path)?;
            nodes.push(FileNode {
                name,
                path,
                kind: NodeKind::Folder,
                children,
            });
        } else {
            nodes.push(FileNode {
                name,
                path,
                kind: NodeKind::File,
                children: Vec::new(),
            });
        }
    }

    nodes.sort_by(compare_siblings);
    Ok(nodes)
}

/// Folders before files; within a kind, case-sensitive byte order on the name.
fn compare_siblings(a: &FileNode, b: &FileNode) -> Ordering {
    a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name))
}
