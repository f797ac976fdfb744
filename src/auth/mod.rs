//! Authentication system
//!
//! Credential records and lookup, password hashing, session root resolution,
//! and the connection handshake.

pub mod credentials;
pub mod handshake;
pub mod hashing;
pub mod home;

pub use credentials::{CredentialRecord, CredentialStore, MemoryCredentialStore};
pub use handshake::{AuthDecision, Session, authenticate};
pub use hashing::{hash_password, verify_password};
pub use home::resolve_session_root;
