//! Session root resolution
//!
//! Turns a credential record's declared home subdirectory into the confined
//! directory a session is locked to, creating it if absent.

use log::warn;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::auth::credentials::CredentialRecord;
use crate::sandbox::confine;

/// Resolves the per-user session root under `boundary`.
///
/// The stored home directory is untrusted: if it fails confinement the
/// session falls back to the boundary itself rather than failing the login.
/// Directory creation goes through the confined path, never a separately
/// computed one.
pub fn resolve_session_root(boundary: &Path, record: &CredentialRecord) -> io::Result<PathBuf> {
    let resolved = match confine(boundary, &record.home_dir) {
        Ok(path) => path,
        Err(e) => {
            warn!(
                "home directory for user {} rejected ({}); falling back to workspace root",
                record.username, e
            );
            boundary.to_path_buf()
        }
    };

    fs::create_dir_all(&resolved)?;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(home_dir: &str) -> CredentialRecord {
        CredentialRecord {
            username: "casey".to_string(),
            password_hash: String::new(),
            home_dir: home_dir.to_string(),
        }
    }

    #[test]
    fn creates_the_home_directory_under_the_boundary() {
        let dir = tempdir().unwrap();
        let boundary = dir.path().canonicalize().unwrap();

        let root = resolve_session_root(&boundary, &record("team-a")).unwrap();
        assert_eq!(root, boundary.join("team-a"));
        assert!(root.is_dir());
    }

    #[test]
    fn creates_missing_ancestors() {
        let dir = tempdir().unwrap();
        let boundary = dir.path().canonicalize().unwrap();

        let root = resolve_session_root(&boundary, &record("org/team-a/casey")).unwrap();
        assert_eq!(root, boundary.join("org/team-a/casey"));
        assert!(root.is_dir());
    }

    #[test]
    fn malicious_home_falls_back_to_the_boundary() {
        let dir = tempdir().unwrap();
        let boundary = dir.path().canonicalize().unwrap();

        let root = resolve_session_root(&boundary, &record("../../etc")).unwrap();
        assert_eq!(root, boundary);
        assert!(root.is_dir());
    }

    #[test]
    fn empty_home_resolves_to_the_boundary() {
        let dir = tempdir().unwrap();
        let boundary = dir.path().canonicalize().unwrap();

        let root = resolve_session_root(&boundary, &record("")).unwrap();
        assert_eq!(root, boundary);
    }
}
