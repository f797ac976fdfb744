//! Workspace sandbox
//!
//! Confines every filesystem operation to a bounded root directory: path
//! confinement, virtual path resolution for gateway sessions, and the
//! filtered directory tree used by the workspace UI.

pub mod confine;
pub mod tree;
pub mod virtual_path;

pub use confine::confine;
pub use tree::{FileNode, NodeKind, build_tree};
pub use virtual_path::{resolve_operand, resolve_virtual, to_real};

/// Directory names gateway sessions may never touch, at any depth.
pub const BLOCKED_DIRS: &[&str] = &[".git", "node_modules"];

/// Checks a virtual path against a blocklist of directory names.
pub fn is_blocked(virtual_path: &str, blocked: &[String]) -> bool {
    virtual_path
        .split('/')
        .any(|segment| blocked.iter().any(|name| name == segment))
}
