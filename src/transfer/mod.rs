//! Transfer module for the file gateway
//!
//! Handles data channel management and file transfers for gateway sessions.

pub mod channel_registry;
pub mod data_channel;
pub mod file_ops;

pub use channel_registry::{ChannelEntry, ChannelRegistry};
pub use data_channel::setup_data_stream;
pub use file_ops::{handle_file_download, handle_file_upload};
