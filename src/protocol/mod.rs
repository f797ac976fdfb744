//! Gateway wire protocol
//!
//! Command parsing, dispatch, and response generation for the file-transfer
//! gateway.

pub mod commands;
pub mod handlers;

pub use commands::{Command, CommandResult, CommandStatus, parse_command};
pub use handlers::handle_command;
