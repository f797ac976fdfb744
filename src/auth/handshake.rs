//! Authentication handshake
//!
//! The per-connection login decision: credential lookup, password
//! verification, and session root resolution, returned as a tagged result so
//! the transport layer stays free of callback conventions. This function only
//! produces the session policy; enforcing it on later operations is the
//! transport's job.

use log::{error, info, warn};
use std::path::{Path, PathBuf};

use crate::auth::credentials::CredentialStore;
use crate::auth::hashing::{DUMMY_HASH, verify_password};
use crate::auth::home::resolve_session_root;
use crate::error::AuthError;

const MAX_CREDENTIAL_LENGTH: usize = 128;

/// An authenticated session: the confined root every subsequent operation is
/// scoped to, and the initial virtual working directory.
#[derive(Debug, Clone)]
pub struct Session {
    pub username: String,
    pub root: PathBuf,
    pub cwd: String,
}

/// Outcome of a login attempt.
#[derive(Debug)]
pub enum AuthDecision {
    Granted(Session),
    Denied(AuthError),
}

/// Basic input sanitation for usernames and passwords.
fn is_valid_input(input: &str, max_length: usize) -> bool {
    !input.trim().is_empty() && input.len() <= max_length && !input.contains(['\r', '\n', '\0'])
}

/// Decides a login attempt.
///
/// A missing user and a wrong password are indistinguishable from outside:
/// both deny with [`AuthError::InvalidCredentials`], and the missing-user
/// path still burns one hash verification against a dummy record so the two
/// cases cost the same.
///
/// Password derivation is deliberately slow; callers on an async runtime
/// should run this on a blocking thread.
pub fn authenticate(
    store: &dyn CredentialStore,
    boundary: &Path,
    username: &str,
    password: &str,
) -> AuthDecision {
    if !is_valid_input(username, MAX_CREDENTIAL_LENGTH)
        || !is_valid_input(password, MAX_CREDENTIAL_LENGTH)
    {
        return AuthDecision::Denied(AuthError::MalformedInput(
            "credential format rejected".to_string(),
        ));
    }

    let record = match store.lookup(username) {
        Some(record) => record,
        None => {
            // Equalize cost with the wrong-password path.
            let _ = verify_password(password, &DUMMY_HASH);
            warn!("login denied: unknown user");
            return AuthDecision::Denied(AuthError::InvalidCredentials);
        }
    };

    if !verify_password(password, &record.password_hash) {
        warn!("login denied for user {}", record.username);
        return AuthDecision::Denied(AuthError::InvalidCredentials);
    }

    match resolve_session_root(boundary, &record) {
        Ok(root) => {
            info!("login granted for user {} (root {})", record.username, root.display());
            AuthDecision::Granted(Session {
                username: record.username,
                root,
                cwd: "/".to_string(),
            })
        }
        Err(e) => {
            error!(
                "failed to prepare session root for user {}: {}",
                record.username, e
            );
            AuthDecision::Denied(AuthError::Unavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::MemoryCredentialStore;
    use tempfile::tempdir;

    fn store() -> MemoryCredentialStore {
        let mut store = MemoryCredentialStore::new();
        store.insert("casey", "hunter2", "team-a");
        store
    }

    #[test]
    fn valid_credentials_grant_a_rooted_session() {
        let dir = tempdir().unwrap();
        let boundary = dir.path().canonicalize().unwrap();

        match authenticate(&store(), &boundary, "casey", "hunter2") {
            AuthDecision::Granted(session) => {
                assert_eq!(session.username, "casey");
                assert_eq!(session.root, boundary.join("team-a"));
                assert_eq!(session.cwd, "/");
                assert!(session.root.is_dir());
            }
            AuthDecision::Denied(e) => panic!("expected grant, got denial: {e}"),
        }
    }

    #[test]
    fn unknown_user_and_wrong_password_are_indistinguishable() {
        let dir = tempdir().unwrap();
        let boundary = dir.path().canonicalize().unwrap();
        let store = store();

        let unknown = authenticate(&store, &boundary, "mallory", "hunter2");
        let wrong = authenticate(&store, &boundary, "casey", "wrong");

        for decision in [unknown, wrong] {
            match decision {
                AuthDecision::Denied(AuthError::InvalidCredentials) => {}
                other => panic!("expected InvalidCredentials, got {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_input_is_rejected_before_lookup() {
        let dir = tempdir().unwrap();
        let boundary = dir.path().canonicalize().unwrap();

        let decision = authenticate(&store(), &boundary, "casey\r\n", "hunter2");
        assert!(matches!(
            decision,
            AuthDecision::Denied(AuthError::MalformedInput(_))
        ));
    }

    #[test]
    fn traversing_home_directory_still_logs_in_at_the_boundary() {
        let dir = tempdir().unwrap();
        let boundary = dir.path().canonicalize().unwrap();
        let mut store = MemoryCredentialStore::new();
        store.insert("escapee", "hunter2", "../../etc");

        match authenticate(&store, &boundary, "escapee", "hunter2") {
            AuthDecision::Granted(session) => assert_eq!(session.root, boundary),
            AuthDecision::Denied(e) => panic!("expected fallback grant, got denial: {e}"),
        }
    }
}
