//! Credential storage
//!
//! Defines the credential record and the lookup seam. Persistent storage (the
//! row-per-user table) lives outside this crate; it plugs in behind
//! [`CredentialStore`]. The in-memory implementation serves small deployments
//! and the tests.

use std::collections::HashMap;

use crate::auth::hashing::hash_password;

/// One provisioned user: unique name, one-way password hash, and the declared
/// home subdirectory. The home directory is untrusted input like any other
/// relative path; the resolver confines it.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub username: String,
    pub password_hash: String,
    pub home_dir: String,
}

/// Lookup seam over whatever holds the user table.
pub trait CredentialStore: Send + Sync {
    /// Exact-match lookup by username.
    fn lookup(&self, username: &str) -> Option<CredentialRecord>;
}

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    records: HashMap<String, CredentialRecord>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisions a user from a plaintext password, hashing it on the way in.
    pub fn insert(&mut self, username: &str, password: &str, home_dir: &str) {
        self.records.insert(
            username.to_string(),
            CredentialRecord {
                username: username.to_string(),
                password_hash: hash_password(password),
                home_dir: home_dir.to_string(),
            },
        );
    }

    /// Inserts an already-hashed record, e.g. a row read from the persistent
    /// user table.
    pub fn insert_record(&mut self, record: CredentialRecord) {
        self.records.insert(record.username.clone(), record);
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn lookup(&self, username: &str) -> Option<CredentialRecord> {
        self.records.get(username).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hashing::verify_password;

    #[test]
    fn lookup_is_exact_match() {
        let mut store = MemoryCredentialStore::new();
        store.insert("alice", "alice123", "alice");

        assert!(store.lookup("alice").is_some());
        assert!(store.lookup("Alice").is_none());
        assert!(store.lookup("ali").is_none());
    }

    #[test]
    fn insert_hashes_the_password() {
        let mut store = MemoryCredentialStore::new();
        store.insert("bob", "bob123", "bob");

        let record = store.lookup("bob").unwrap();
        assert_ne!(record.password_hash, "bob123");
        assert!(verify_password("bob123", &record.password_hash));
    }
}
