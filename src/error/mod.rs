//! Error handling for the workspace gateway
//!
//! Defines the error taxonomy shared by all modules.

pub mod types;

pub use types::{AuthError, GatewayError, LifecycleError, SandboxError, StorageError};
