//! Error types
//!
//! Defines domain-specific error types for each module of the gateway.

use std::fmt;
use std::io;

/// Sandbox module errors
#[derive(Debug)]
pub enum SandboxError {
    /// An untrusted path escaped its confinement boundary.
    Traversal(String),
    /// A path operand was syntactically unusable (empty, embedded NUL).
    InvalidPath(String),
}

impl fmt::Display for SandboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SandboxError::Traversal(p) => write!(f, "Path traversal attempt: {}", p),
            SandboxError::InvalidPath(p) => write!(f, "Invalid path: {}", p),
        }
    }
}

impl std::error::Error for SandboxError {}

/// Authentication module errors
#[derive(Debug)]
pub enum AuthError {
    /// Unknown username or wrong password. The two cases are merged so
    /// callers cannot enumerate usernames.
    InvalidCredentials,
    /// Input failed sanitation before any lookup happened.
    MalformedInput(String),
    /// The session root could not be prepared.
    Unavailable,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::MalformedInput(s) => write!(f, "Malformed input: {}", s),
            AuthError::Unavailable => write!(f, "Service temporarily unavailable"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Storage module errors
#[derive(Debug)]
pub enum StorageError {
    NotFound(String),
    AlreadyExists(String),
    NotADirectory(String),
    NotAFile(String),
    InvalidPath(String),
    Traversal(String),
    Io(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound(p) => write!(f, "Not found: {}", p),
            StorageError::AlreadyExists(p) => write!(f, "Already exists: {}", p),
            StorageError::NotADirectory(p) => write!(f, "Not a directory: {}", p),
            StorageError::NotAFile(p) => write!(f, "Not a file: {}", p),
            StorageError::InvalidPath(p) => write!(f, "Invalid path: {}", p),
            StorageError::Traversal(p) => write!(f, "Path traversal attempt: {}", p),
            StorageError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        StorageError::Io(error)
    }
}

impl From<SandboxError> for StorageError {
    fn from(error: SandboxError) -> Self {
        match error {
            SandboxError::Traversal(p) => StorageError::Traversal(p),
            SandboxError::InvalidPath(p) => StorageError::InvalidPath(p),
        }
    }
}

/// Gateway lifecycle errors
#[derive(Debug)]
pub enum LifecycleError {
    /// The control listener could not be bound.
    BindFailed(String, io::Error),
    Io(io::Error),
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::BindFailed(addr, e) => {
                write!(f, "Failed to bind to {}: {}", addr, e)
            }
            LifecycleError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for LifecycleError {}

impl From<io::Error> for LifecycleError {
    fn from(error: io::Error) -> Self {
        LifecycleError::Io(error)
    }
}

/// General gateway error that encompasses all error types
#[derive(Debug)]
pub enum GatewayError {
    Sandbox(SandboxError),
    Auth(AuthError),
    Storage(StorageError),
    Lifecycle(LifecycleError),
    Io(io::Error),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Sandbox(e) => write!(f, "Sandbox error: {}", e),
            GatewayError::Auth(e) => write!(f, "Authentication error: {}", e),
            GatewayError::Storage(e) => write!(f, "Storage error: {}", e),
            GatewayError::Lifecycle(e) => write!(f, "Lifecycle error: {}", e),
            GatewayError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<SandboxError> for GatewayError {
    fn from(error: SandboxError) -> Self {
        GatewayError::Sandbox(error)
    }
}

impl From<AuthError> for GatewayError {
    fn from(error: AuthError) -> Self {
        GatewayError::Auth(error)
    }
}

impl From<StorageError> for GatewayError {
    fn from(error: StorageError) -> Self {
        GatewayError::Storage(error)
    }
}

impl From<LifecycleError> for GatewayError {
    fn from(error: LifecycleError) -> Self {
        GatewayError::Lifecycle(error)
    }
}

impl From<io::Error> for GatewayError {
    fn from(error: io::Error) -> Self {
        GatewayError::Io(error)
    }
}
