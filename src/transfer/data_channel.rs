//! Module `data_channel`
//!
//! Establishes the per-transfer data connection for LIST, RETR, and STOR:
//! passive mode accepts the client on a previously bound listener, active
//! mode connects back to the address the client supplied.

use log::{error, info, warn};
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

use crate::transfer::ChannelRegistry;

const MAX_ACCEPT_ATTEMPTS: u32 = 10;
const INITIAL_SLEEP_MS: u64 = 100;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Establishes a data connection for the given client.
///
/// Passive mode (entry has a listener): waits for the client to connect,
/// rejecting peers whose IP does not match the channel owner. Active mode
/// (data socket only): connects out to the client.
pub fn setup_data_stream(
    channel_registry: &mut ChannelRegistry,
    client_addr: &SocketAddr,
) -> Option<TcpStream> {
    let entry = channel_registry.get(client_addr)?;

    if entry.listener().is_some() {
        accept_passive(channel_registry, client_addr)
    } else if let Some(data_socket) = entry.data_socket() {
        connect_active(client_addr, *data_socket)
    } else {
        error!("No data channel setup for client {}", client_addr);
        None
    }
}

/// Passive mode: accept the client on our listener, with bounded backoff
/// since the listener is non-blocking.
fn accept_passive(
    channel_registry: &mut ChannelRegistry,
    client_addr: &SocketAddr,
) -> Option<TcpStream> {
    let entry = channel_registry.get_mut(client_addr)?;
    let owner_ip = entry.owner_ip();
    let listener = entry.listener_mut()?;

    let mut attempt = 0;
    let mut delay = INITIAL_SLEEP_MS;

    while attempt < MAX_ACCEPT_ATTEMPTS {
        match listener.accept() {
            Ok((stream, peer_addr)) => {
                let is_owner = owner_ip.map(|owner| owner == peer_addr.ip()).unwrap_or(true);
                if !is_owner {
                    warn!(
                        "Rejected data connection from {} for client {}'s channel",
                        peer_addr, client_addr
                    );
                    let _ = stream.shutdown(std::net::Shutdown::Both);
                    return None;
                }

                info!(
                    "Data connection accepted from {} for client {}",
                    peer_addr, client_addr
                );
                if let Err(e) = stream.set_nonblocking(false) {
                    warn!("Failed to set data stream to blocking mode: {}", e);
                }
                return Some(stream);
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(delay));
                delay *= 2;
                attempt += 1;
            }
            Err(e) => {
                error!("Fatal error accepting data connection: {}", e);
                return None;
            }
        }
    }

    error!(
        "Timeout waiting for data connection from client {} after {} attempts",
        client_addr, attempt
    );
    None
}

/// Active mode: the server initiates the connection to the client's data
/// socket.
fn connect_active(client_addr: &SocketAddr, data_socket: SocketAddr) -> Option<TcpStream> {
    match TcpStream::connect_timeout(&data_socket, CONNECT_TIMEOUT) {
        Ok(stream) => {
            info!(
                "Connected to client {} at data socket {} in active mode",
                client_addr, data_socket
            );
            Some(stream)
        }
        Err(e) => {
            error!(
                "Failed to connect to client {} at data socket {}: {}",
                client_addr, data_socket, e
            );
            None
        }
    }
}
