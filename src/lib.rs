pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod files;
pub mod gateway;
pub mod protocol;
pub mod sandbox;
pub mod transfer;

pub use config::{GatewayConfig, Settings, SharedSettings, StartupConfig};
pub use gateway::{Gateway, GatewayState, GatewayStatus};
