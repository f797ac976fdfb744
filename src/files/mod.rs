//! Project-root file browser core
//!
//! The operations behind the workspace UI's file endpoints. Unlike gateway
//! sessions these run against the single fixed project boundary, but they use
//! the same confinement.

pub mod browser;
pub mod operations;

pub use browser::browse;
pub use operations::{
    CreateRequest, DeleteRequest, EntryKind, RenameRequest, create_entry, delete_entry,
    delete_request_path, read_file, rename_entry, write_file,
};
