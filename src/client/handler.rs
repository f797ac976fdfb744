//! Authenticated session command loop.

use log::{error, info};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};

use crate::client::Client;
use crate::config::{SharedSettings, StartupConfig};
use crate::protocol::{CommandStatus, handle_command, parse_command};
use crate::transfer::ChannelRegistry;

/// Runs the command loop for one authenticated session.
///
/// - Reads command lines from the client and dispatches via `handle_command`.
/// - Session state lives in the shared `clients` registry for the duration of
///   the connection.
/// - A lifecycle shutdown signal ends the session between commands.
pub async fn handle_client(
    cmd_stream: TcpStream,
    clients: Arc<Mutex<HashMap<SocketAddr, Client>>>,
    client_addr: SocketAddr,
    channel_registry: Arc<Mutex<ChannelRegistry>>,
    config: Arc<StartupConfig>,
    settings: SharedSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    let (read_half, mut write_half) = cmd_stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();

        let read = tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    let _ = write_half.write_all(b"421 Service shutting down\r\n").await;
                    info!("Session {} released by gateway shutdown", client_addr);
                    break;
                }
                continue;
            }
            read = reader.read_line(&mut line) => read,
        };

        match read {
            Ok(0) => {
                info!("Connection closed by client {}", client_addr);
                break;
            }
            Ok(_) => {
                if line.len() > config.max_command_length {
                    let _ = write_half.write_all(b"500 Command too long\r\n").await;
                    continue;
                }

                let command = parse_command(line.trim_end_matches("\r\n"));
                let advertised = settings.read().await.advertised_address.clone();

                // Locks are scoped to the dispatch; responses go out
                // without holding either registry.
                let result = {
                    let mut clients_guard = clients.lock().await;
                    let mut channels_guard = channel_registry.lock().await;
                    clients_guard.get_mut(&client_addr).map(|client| {
                        handle_command(client, &command, &mut channels_guard, &config, &advertised)
                    })
                };

                match result {
                    Some(result) => {
                        if let Some(msg) = result.message {
                            let _ = write_half.write_all(msg.as_bytes()).await;
                        }

                        if matches!(result.status, CommandStatus::CloseConnection) {
                            info!("Client {} requested to quit", client_addr);
                            break;
                        }
                    }
                    None => {
                        error!("Client {} not found in session registry", client_addr);
                        let _ = write_half
                            .write_all(b"421 Client session not found\r\n")
                            .await;
                        break;
                    }
                }
            }
            Err(e) => {
                error!("Failed to read from {}: {}", client_addr, e);
                break;
            }
        }
    }

    // Session teardown: registry entry and any data channel go away with the
    // connection.
    channel_registry.lock().await.cleanup_all(&client_addr);
    clients.lock().await.remove(&client_addr);
    info!("Client {} disconnected", client_addr);
}
