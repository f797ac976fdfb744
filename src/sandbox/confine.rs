//! Path confinement
//!
//! Maps untrusted relative paths onto a trusted boundary directory. This is
//! the single choke point every file operation goes through; nothing else in
//! the crate builds absolute paths from client input.

use std::path::{Component, Path, PathBuf};

use crate::error::SandboxError;

/// Confines an untrusted relative path to a boundary directory.
///
/// The input is joined onto `boundary` and lexically normalized (`.` removed,
/// `..` popped, separators unified) without touching the filesystem, so the
/// target does not need to exist yet. The escape check runs on the normalized
/// result, never on the raw string: a prefix check on unresolved input is
/// meaningless once `..` segments are present.
///
/// Absolute-looking input (leading separators, drive prefixes) is treated as
/// boundary-relative, never as an override. An empty input resolves to the
/// boundary itself.
///
/// `boundary` must be an absolute, normalized path; the gateway canonicalizes
/// its roots once at startup.
pub fn confine(boundary: &Path, relative: &str) -> Result<PathBuf, SandboxError> {
    if relative.contains('\0') {
        return Err(SandboxError::InvalidPath(relative.to_string()));
    }

    // Client input arrives with either separator convention.
    let unified = relative.replace('\\', "/");
    let stripped = unified.strip_prefix('/').unwrap_or(&unified);

    let mut confined = boundary.to_path_buf();
    let mut depth: usize = 0;

    for component in Path::new(stripped).components() {
        match component {
            Component::Normal(part) => {
                confined.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(SandboxError::Traversal(relative.to_string()));
                }
                confined.pop();
                depth -= 1;
            }
            // Residual absolute syntax is neutralized, not honored.
            Component::RootDir | Component::Prefix(_) => {}
        }
    }

    // Invariant: the normalized result is the boundary or a descendant of it.
    if confined != boundary && !confined.starts_with(boundary) {
        return Err(SandboxError::Traversal(relative.to_string()));
    }

    Ok(confined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary() -> PathBuf {
        PathBuf::from("/srv/workspaces")
    }

    #[test]
    fn empty_input_resolves_to_boundary() {
        assert_eq!(confine(&boundary(), "").unwrap(), boundary());
    }

    #[test]
    fn plain_relative_path_is_joined() {
        assert_eq!(
            confine(&boundary(), "team-a/notes.md").unwrap(),
            PathBuf::from("/srv/workspaces/team-a/notes.md")
        );
    }

    #[test]
    fn single_leading_separator_is_stripped() {
        assert_eq!(
            confine(&boundary(), "/team-a").unwrap(),
            PathBuf::from("/srv/workspaces/team-a")
        );
    }

    #[test]
    fn absolute_looking_input_stays_inside_boundary() {
        assert_eq!(
            confine(&boundary(), "//etc/passwd").unwrap(),
            PathBuf::from("/srv/workspaces/etc/passwd")
        );
    }

    #[test]
    fn dot_segments_are_removed() {
        assert_eq!(
            confine(&boundary(), "./a/./b").unwrap(),
            PathBuf::from("/srv/workspaces/a/b")
        );
    }

    #[test]
    fn internal_parent_segments_resolve() {
        assert_eq!(
            confine(&boundary(), "a/b/../c").unwrap(),
            PathBuf::from("/srv/workspaces/a/c")
        );
    }

    #[test]
    fn escape_via_parent_segments_is_rejected() {
        assert!(matches!(
            confine(&boundary(), "../../etc"),
            Err(SandboxError::Traversal(_))
        ));
    }

    #[test]
    fn escape_after_descending_is_rejected() {
        assert!(matches!(
            confine(&boundary(), "a/../../etc"),
            Err(SandboxError::Traversal(_))
        ));
    }

    #[test]
    fn backslash_separators_are_unified() {
        assert!(matches!(
            confine(&boundary(), "..\\..\\etc"),
            Err(SandboxError::Traversal(_))
        ));
        assert_eq!(
            confine(&boundary(), "a\\b").unwrap(),
            PathBuf::from("/srv/workspaces/a/b")
        );
    }

    #[test]
    fn parent_flood_never_escapes() {
        for input in [
            "..",
            "../..",
            "../../../../../../..",
            "/..",
            "/../../x",
            "a/../..",
        ] {
            match confine(&boundary(), input) {
                Ok(path) => assert!(path.starts_with(boundary()) || path == boundary()),
                Err(SandboxError::Traversal(_)) => {}
                Err(other) => panic!("unexpected error for {input:?}: {other}"),
            }
        }
    }

    #[test]
    fn embedded_nul_is_invalid() {
        assert!(matches!(
            confine(&boundary(), "a\0b"),
            Err(SandboxError::InvalidPath(_))
        ));
    }
}
