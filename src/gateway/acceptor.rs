//! Connection acceptance and the authentication phase.
//!
//! One task per connection: greeting, USER/PASS handshake, capacity check,
//! then hand-off to the session command loop. The handshake's only output is
//! the session policy (confined root, blocklist); per-operation enforcement
//! happens in the protocol handlers.

use log::{error, info, warn};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, watch};

use crate::auth::{AuthDecision, CredentialStore, authenticate};
use crate::client::{Client, handle_client};
use crate::config::{SharedSettings, StartupConfig};
use crate::error::AuthError;
use crate::protocol::{Command, parse_command};
use crate::transfer::ChannelRegistry;

/// Immutable pieces every connection needs, owned by the lifecycle.
pub(crate) struct GatewayShared {
    pub config: Arc<StartupConfig>,
    pub settings: SharedSettings,
    pub credentials: Arc<dyn CredentialStore>,
    pub boundary: PathBuf,
}

/// Accept loop: runs until the lifecycle signals shutdown.
pub(crate) async fn run(
    listener: TcpListener,
    shared: Arc<GatewayShared>,
    mut shutdown: watch::Receiver<bool>,
) {
    let clients: Arc<Mutex<HashMap<SocketAddr, Client>>> = Arc::new(Mutex::new(HashMap::new()));
    let channels = Arc::new(Mutex::new(ChannelRegistry::default()));

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("Gateway accept loop stopped");
                    break;
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let shared = Arc::clone(&shared);
                    let clients = Arc::clone(&clients);
                    let channels = Arc::clone(&channels);
                    let shutdown = shutdown.clone();

                    // One task per connection so a slow handshake never
                    // blocks the accept loop.
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(stream, addr, shared, clients, channels, shutdown)
                                .await
                        {
                            warn!("Failed to handle client {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

/// Greets a new connection, runs the authentication phase, and hands the
/// stream to the session loop once a session is granted.
async fn handle_connection(
    stream: TcpStream,
    client_addr: SocketAddr,
    shared: Arc<GatewayShared>,
    clients: Arc<Mutex<HashMap<SocketAddr, Client>>>,
    channels: Arc<Mutex<ChannelRegistry>>,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    let mut pending_username: Option<String> = None;

    reader
        .get_mut()
        .write_all(b"220 Workspace gateway ready\r\n")
        .await?;
    reader.get_mut().flush().await?;

    loop {
        line.clear();
        let n = tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    let _ = reader.get_mut().write_all(b"421 Service shutting down\r\n").await;
                    return Ok(());
                }
                continue;
            }
            read = reader.read_line(&mut line) => read?,
        };

        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "Client disconnected during authentication",
            ));
        }

        match parse_command(line.trim_end_matches("\r\n")) {
            Command::USER(username) => {
                // Deliberately the same answer for any username.
                pending_username = Some(username);
                reader
                    .get_mut()
                    .write_all(b"331 Password required\r\n")
                    .await?;
            }
            Command::PASS(password) => {
                let Some(username) = pending_username.take() else {
                    reader
                        .get_mut()
                        .write_all(b"503 Login with USER first\r\n")
                        .await?;
                    continue;
                };

                // Hash verification is intentionally slow; keep it off the
                // async workers.
                let decision = {
                    let credentials = Arc::clone(&shared.credentials);
                    let boundary = shared.boundary.clone();
                    tokio::task::spawn_blocking(move || {
                        authenticate(credentials.as_ref(), &boundary, &username, &password)
                    })
                    .await
                };

                let decision = match decision {
                    Ok(decision) => decision,
                    Err(e) => {
                        error!("Authentication task failed: {}", e);
                        reader
                            .get_mut()
                            .write_all(b"421 Service not available\r\n")
                            .await?;
                        return Ok(());
                    }
                };

                match decision {
                    AuthDecision::Granted(session) => {
                        let mut clients_guard = clients.lock().await;

                        if clients_guard.len() >= shared.config.max_clients {
                            reader
                                .get_mut()
                                .write_all(b"421 Too many connections. Try again later.\r\n")
                                .await?;
                            return Ok(());
                        }

                        let mut client = Client::default();
                        client.set_client_addr(Some(client_addr));
                        client.attach_session(session);
                        clients_guard.insert(client_addr, client);

                        info!(
                            "Authenticated client {} ({}/{} sessions)",
                            client_addr,
                            clients_guard.len(),
                            shared.config.max_clients
                        );
                        drop(clients_guard);

                        reader
                            .get_mut()
                            .write_all(b"230 Login successful\r\n")
                            .await?;

                        let cmd_stream = reader.into_inner();
                        handle_client(
                            cmd_stream,
                            clients,
                            client_addr,
                            channels,
                            Arc::clone(&shared.config),
                            Arc::clone(&shared.settings),
                            shutdown,
                        )
                        .await;

                        return Ok(());
                    }
                    AuthDecision::Denied(AuthError::Unavailable) => {
                        reader
                            .get_mut()
                            .write_all(b"421 Service not available\r\n")
                            .await?;
                        return Ok(());
                    }
                    AuthDecision::Denied(_) => {
                        // Unknown user and wrong password are one answer.
                        reader
                            .get_mut()
                            .write_all(b"530 Invalid credentials\r\n")
                            .await?;
                    }
                }
            }
            Command::QUIT => {
                reader.get_mut().write_all(b"221 Goodbye\r\n").await?;
                return Ok(());
            }
            _ => {
                reader
                    .get_mut()
                    .write_all(b"530 Please login with USER and PASS\r\n")
                    .await?;
            }
        }
    }
}
