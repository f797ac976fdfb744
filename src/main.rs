//! Workspace Gateway - Entry Point
//!
//! Self-hosted workspace file gateway: confines every file operation to the
//! workspace root and exposes the sandboxed filesystem to authenticated
//! clients over the file-transfer service.

use log::{error, info};
use std::sync::Arc;

use workspace_gateway::auth::MemoryCredentialStore;
use workspace_gateway::{Gateway, GatewayConfig};

#[tokio::main]
async fn main() {
    // env_logger picks up the RUST_LOG environment variable
    env_logger::init();

    let config = match GatewayConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    let (startup, settings) = config.split();

    // Demo provisioning; real deployments load the persistent user table.
    let mut store = MemoryCredentialStore::new();
    store.insert("alice", "alice123", "alice");
    store.insert("bob", "bob123", "bob");

    let gateway = match Gateway::new(startup, settings, Arc::new(store)) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!("Failed to prepare workspace root: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = gateway.reconcile().await {
        error!("Gateway did not start: {}", e);
    }

    let status = gateway.status().await;
    info!(
        "Workspace gateway up (transfer service running: {}, port {})",
        status.running, status.port
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    gateway.stop().await;
    info!("Shutdown complete");
}
