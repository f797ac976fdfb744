//! Workspace tree browsing.

use std::path::Path;

use crate::error::StorageError;
use crate::sandbox::{FileNode, build_tree};

/// Lists the whole workspace tree rooted at the project boundary.
///
/// The boundary is trusted (established once at startup); filtering and
/// ordering are the tree builder's concern.
pub fn browse(root: &Path) -> Result<Vec<FileNode>, StorageError> {
    build_tree(root).map_err(StorageError::from)
}
