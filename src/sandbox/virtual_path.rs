//! Virtual path resolution
//!
//! Gateway sessions see a virtual filesystem rooted at `/` inside their
//! confined root. These helpers resolve the virtual working directory and
//! command operands; `to_real` is the only bridge back to real paths and it
//! always goes through [`confine`](crate::sandbox::confine).

use std::path::{Path, PathBuf};

use crate::error::SandboxError;
use crate::sandbox::confine;

/// Resolves a target against the current virtual directory.
///
/// A target with a leading `/` replaces the current directory, anything else
/// is appended to it. The combined path is normalized segment by segment;
/// climbing above the virtual root is a traversal error, not a clamp, so the
/// caller can refuse the operation and keep its state unchanged.
pub fn resolve_virtual(current: &str, target: &str) -> Result<String, SandboxError> {
    if target.is_empty() {
        return Err(SandboxError::InvalidPath("empty path".to_string()));
    }

    let unified = target.replace('\\', "/");
    let joined = if unified.starts_with('/') {
        unified
    } else {
        format!("{}/{}", current.trim_end_matches('/'), unified)
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(SandboxError::Traversal(target.to_string()));
                }
            }
            name => segments.push(name),
        }
    }

    if segments.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(format!("/{}", segments.join("/")))
    }
}

/// Maps a virtual path onto the session's confined root.
pub fn to_real(root: &Path, virtual_path: &str) -> Result<PathBuf, SandboxError> {
    confine(root, virtual_path)
}

/// Resolves a file operand against the current virtual directory and maps it
/// into the confined root. Returns both the real path for I/O and the virtual
/// path for responses and logs.
pub fn resolve_operand(
    root: &Path,
    current: &str,
    operand: &str,
) -> Result<(PathBuf, String), SandboxError> {
    let virtual_path = resolve_virtual(current, operand)?;
    let real_path = to_real(root, &virtual_path)?;
    Ok((real_path, virtual_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_target_appends_to_current() {
        assert_eq!(resolve_virtual("/team-a", "docs").unwrap(), "/team-a/docs");
    }

    #[test]
    fn absolute_target_replaces_current() {
        assert_eq!(resolve_virtual("/team-a", "/shared").unwrap(), "/shared");
    }

    #[test]
    fn parent_segment_pops_within_root() {
        assert_eq!(resolve_virtual("/team-a/docs", "..").unwrap(), "/team-a");
    }

    #[test]
    fn climbing_above_root_is_a_traversal() {
        assert!(matches!(
            resolve_virtual("/", "../team-b"),
            Err(SandboxError::Traversal(_))
        ));
        assert!(matches!(
            resolve_virtual("/a", "../../.."),
            Err(SandboxError::Traversal(_))
        ));
    }

    #[test]
    fn empty_target_is_invalid() {
        assert!(matches!(
            resolve_virtual("/", ""),
            Err(SandboxError::InvalidPath(_))
        ));
    }

    #[test]
    fn operand_resolves_to_confined_real_path() {
        let root = Path::new("/srv/workspaces/team-a");
        let (real, virt) = resolve_operand(root, "/docs", "plan.md").unwrap();
        assert_eq!(real, PathBuf::from("/srv/workspaces/team-a/docs/plan.md"));
        assert_eq!(virt, "/docs/plan.md");
    }
}
