//! Gateway lifecycle
//!
//! Explicit state machine for the network-facing file-transfer service. The
//! gateway is either `Stopped` or `Running`; transitions happen only through
//! `reconcile`/`start`/`stop`/`restart`, serialized by one lock. A start
//! failure is reported to the caller and logged, never fatal to the host
//! process.

use log::{debug, error, info};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::auth::CredentialStore;
use crate::config::{SharedSettings, StartupConfig};
use crate::error::LifecycleError;
use crate::gateway::acceptor::{self, GatewayShared};

/// Observable state of the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    Stopped,
    Running,
}

/// Introspection snapshot for operators and the settings UI.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    pub running: bool,
    pub port: u16,
}

/// Resources held while the listener is up.
struct RunningGateway {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    port: u16,
}

/// The supervising component owning the gateway's mutable state.
pub struct Gateway {
    shared: Arc<GatewayShared>,
    inner: Mutex<Option<RunningGateway>>,
}

impl Gateway {
    /// Creates a stopped gateway. The workspace root is created if absent and
    /// canonicalized once; the result is the confinement boundary for every
    /// session this gateway grants.
    pub fn new(
        config: StartupConfig,
        settings: SharedSettings,
        credentials: Arc<dyn CredentialStore>,
    ) -> io::Result<Self> {
        let root = config.workspace_root_path();
        fs::create_dir_all(&root)?;
        let boundary = root.canonicalize()?;
        info!("Workspace boundary: {}", boundary.display());

        Ok(Self {
            shared: Arc::new(GatewayShared {
                config: Arc::new(config),
                settings,
                credentials,
                boundary,
            }),
            inner: Mutex::new(None),
        })
    }

    /// The confinement boundary sessions are resolved under.
    pub fn boundary(&self) -> &Path {
        &self.shared.boundary
    }

    /// Reads the current `gateway_enabled` setting and converges the running
    /// state to it. Safe to call repeatedly; each call re-reads the flag.
    pub async fn reconcile(&self) -> Result<(), LifecycleError> {
        let enabled = self.shared.settings.read().await.gateway_enabled;
        let mut inner = self.inner.lock().await;

        if enabled && inner.is_none() {
            self.start_locked(&mut inner).await
        } else if !enabled && inner.is_some() {
            Self::stop_locked(&mut inner).await;
            Ok(())
        } else {
            Ok(())
        }
    }

    /// Starts the listener. A no-op when already running.
    pub async fn start(&self) -> Result<(), LifecycleError> {
        let mut inner = self.inner.lock().await;
        if inner.is_some() {
            debug!("Gateway already running; start ignored");
            return Ok(());
        }
        self.start_locked(&mut inner).await
    }

    /// Stops the listener and releases all sessions. Idempotent.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        Self::stop_locked(&mut inner).await;
    }

    /// Stop followed by start under one lock; observers only ever see the
    /// final state.
    pub async fn restart(&self) -> Result<(), LifecycleError> {
        let mut inner = self.inner.lock().await;
        Self::stop_locked(&mut inner).await;
        self.start_locked(&mut inner).await
    }

    pub async fn state(&self) -> GatewayState {
        if self.inner.lock().await.is_some() {
            GatewayState::Running
        } else {
            GatewayState::Stopped
        }
    }

    pub async fn status(&self) -> GatewayStatus {
        let inner = self.inner.lock().await;
        match inner.as_ref() {
            Some(running) => GatewayStatus {
                running: true,
                port: running.port,
            },
            None => GatewayStatus {
                running: false,
                port: self.shared.config.control_port,
            },
        }
    }

    async fn start_locked(
        &self,
        inner: &mut Option<RunningGateway>,
    ) -> Result<(), LifecycleError> {
        let socket = self.shared.config.control_socket();
        let listener = match TcpListener::bind(socket.as_str()).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind gateway listener on {}: {}", socket, e);
                return Err(LifecycleError::BindFailed(socket, e));
            }
        };
        let port = listener.local_addr().map_err(LifecycleError::Io)?.port();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(acceptor::run(listener, Arc::clone(&self.shared), shutdown_rx));

        *inner = Some(RunningGateway {
            shutdown: shutdown_tx,
            task,
            port,
        });

        info!("Gateway listening on {} (port {})", socket, port);
        Ok(())
    }

    async fn stop_locked(inner: &mut Option<RunningGateway>) {
        if let Some(running) = inner.take() {
            let _ = running.shutdown.send(true);
            if let Err(e) = running.task.await {
                if !e.is_cancelled() {
                    error!("Gateway accept task ended abnormally: {}", e);
                }
            }
            info!("Gateway stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryCredentialStore;
    use crate::config::Settings;
    use tempfile::{TempDir, tempdir};
    use tokio::sync::RwLock;

    fn fixture(enabled: bool) -> (Gateway, SharedSettings, TempDir) {
        let dir = tempdir().unwrap();
        let mut config = StartupConfig::default();
        config.control_port = 0; // ephemeral port for tests
        config.workspace_root = dir.path().to_string_lossy().to_string();

        let settings = Arc::new(RwLock::new(Settings {
            gateway_enabled: enabled,
            advertised_address: "127.0.0.1".to_string(),
        }));

        let gateway = Gateway::new(
            config,
            Arc::clone(&settings),
            Arc::new(MemoryCredentialStore::new()),
        )
        .unwrap();

        (gateway, settings, dir)
    }

    #[tokio::test]
    async fn reconcile_disabled_while_stopped_stays_stopped() {
        let (gateway, _settings, _dir) = fixture(false);

        gateway.reconcile().await.unwrap();
        assert_eq!(gateway.state().await, GatewayState::Stopped);
        assert!(!gateway.status().await.running);
    }

    #[tokio::test]
    async fn reconcile_enabled_twice_transitions_once() {
        let (gateway, _settings, _dir) = fixture(true);

        gateway.reconcile().await.unwrap();
        let port = gateway.status().await.port;
        assert_eq!(gateway.state().await, GatewayState::Running);

        gateway.reconcile().await.unwrap();
        assert_eq!(gateway.state().await, GatewayState::Running);
        assert_eq!(gateway.status().await.port, port);

        gateway.stop().await;
    }

    #[tokio::test]
    async fn reconcile_disabled_stops_a_running_gateway() {
        let (gateway, settings, _dir) = fixture(true);

        gateway.reconcile().await.unwrap();
        assert_eq!(gateway.state().await, GatewayState::Running);

        settings.write().await.gateway_enabled = false;
        gateway.reconcile().await.unwrap();
        assert_eq!(gateway.state().await, GatewayState::Stopped);
    }

    #[tokio::test]
    async fn stop_when_stopped_is_a_noop() {
        let (gateway, _settings, _dir) = fixture(false);

        gateway.stop().await;
        gateway.stop().await;
        assert_eq!(gateway.state().await, GatewayState::Stopped);
    }

    #[tokio::test]
    async fn restart_lands_running() {
        let (gateway, _settings, _dir) = fixture(true);

        gateway.start().await.unwrap();
        gateway.restart().await.unwrap();
        assert_eq!(gateway.state().await, GatewayState::Running);

        gateway.stop().await;
        assert_eq!(gateway.state().await, GatewayState::Stopped);
    }

    #[tokio::test]
    async fn bind_failure_leaves_the_gateway_stopped() {
        let dir = tempdir().unwrap();
        // Occupy a port so start() must fail.
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let mut config = StartupConfig::default();
        config.control_port = port;
        config.workspace_root = dir.path().to_string_lossy().to_string();

        let settings = Arc::new(RwLock::new(Settings {
            gateway_enabled: true,
            advertised_address: "127.0.0.1".to_string(),
        }));
        let gateway = Gateway::new(config, settings, Arc::new(MemoryCredentialStore::new())).unwrap();

        assert!(gateway.start().await.is_err());
        assert_eq!(gateway.state().await, GatewayState::Stopped);
        assert!(!gateway.status().await.running);
    }
}
