//! Module `channel_registry`
//!
//! Centralized registry of data channels per client: active-mode data
//! sockets, passive-mode listeners, and allocation of listener ports from the
//! configured range.

use log::warn;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::ops::Range;

/// State of a single data channel associated with one client.
#[derive(Default)]
pub struct ChannelEntry {
    data_socket: Option<SocketAddr>, // IP:port the client gave for active mode
    data_stream: Option<TcpStream>,  // Established stream for the transfer
    listener: Option<TcpListener>,   // Listener socket for passive mode
    owner_ip: Option<IpAddr>,        // Client that owns this channel
}

impl ChannelEntry {
    pub fn data_socket(&self) -> Option<&SocketAddr> {
        self.data_socket.as_ref()
    }

    pub fn listener(&self) -> Option<&TcpListener> {
        self.listener.as_ref()
    }

    pub fn listener_mut(&mut self) -> Option<&mut TcpListener> {
        self.listener.as_mut()
    }

    pub fn owner_ip(&self) -> Option<IpAddr> {
        self.owner_ip
    }

    pub fn set_data_socket(&mut self, socket: Option<SocketAddr>) {
        self.data_socket = socket;
    }

    pub fn set_data_stream(&mut self, stream: Option<TcpStream>) {
        self.data_stream = stream;
    }

    pub fn set_listener(&mut self, listener: Option<TcpListener>) {
        self.listener = listener;
    }

    pub fn set_owner_ip(&mut self, ip: Option<IpAddr>) {
        self.owner_ip = ip;
    }

    /// Completely cleans up all resources in this entry.
    pub fn cleanup_all(&mut self) {
        if let Some(stream) = self.data_stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        self.listener = None;
        self.data_socket = None;
        self.owner_ip = None;
    }
}

/// Registry mapping control-connection addresses to their data channels.
#[derive(Default)]
pub struct ChannelRegistry {
    registry: HashMap<SocketAddr, ChannelEntry>,
}

impl ChannelRegistry {
    /// Inserts or replaces the data channel entry for the given client.
    ///
    /// If the provided data socket is already in use by another client the
    /// insertion is skipped with a warning.
    pub fn insert(&mut self, addr: SocketAddr, entry: ChannelEntry) {
        if let Some(socket) = entry.data_socket {
            if self.is_socket_taken(&socket) {
                warn!("Attempted to insert a data socket already in use: {socket}");
                return;
            }
        }
        self.registry.insert(addr, entry);
    }

    /// Removes and returns the entry for a client address, if any.
    pub fn remove(&mut self, addr: &SocketAddr) -> Option<ChannelEntry> {
        self.registry.remove(addr)
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<&ChannelEntry> {
        self.registry.get(addr)
    }

    pub fn get_mut(&mut self, addr: &SocketAddr) -> Option<&mut ChannelEntry> {
        self.registry.get_mut(addr)
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.registry.contains_key(addr)
    }

    /// Finds the next socket in the passive-mode port range that is not
    /// currently assigned to any client.
    pub fn next_available_socket(&self, host: &str, range: Range<u16>) -> Option<SocketAddr> {
        for port in range {
            let Ok(data_socket) = format!("{host}:{port}").parse::<SocketAddr>() else {
                return None;
            };
            if !self.is_socket_taken(&data_socket) {
                return Some(data_socket);
            }
        }
        None
    }

    /// Checks if the socket is already assigned as a data socket.
    pub fn is_socket_taken(&self, addr: &SocketAddr) -> bool {
        self.registry
            .values()
            .any(|entry| entry.data_socket.as_ref() == Some(addr))
    }

    /// Completely cleans up all data channel resources for a client.
    pub fn cleanup_all(&mut self, client_addr: &SocketAddr) {
        if let Some(mut entry) = self.remove(client_addr) {
            entry.cleanup_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn next_available_socket_skips_taken_ports() {
        let mut registry = ChannelRegistry::default();
        let mut entry = ChannelEntry::default();
        entry.set_data_socket(Some(addr(4000)));
        registry.insert(addr(9000), entry);

        let next = registry.next_available_socket("127.0.0.1", 4000..4003).unwrap();
        assert_eq!(next, addr(4001));
    }

    #[test]
    fn exhausted_range_yields_none() {
        let mut registry = ChannelRegistry::default();
        let mut entry = ChannelEntry::default();
        entry.set_data_socket(Some(addr(4000)));
        registry.insert(addr(9000), entry);

        assert!(registry.next_available_socket("127.0.0.1", 4000..4001).is_none());
    }

    #[test]
    fn duplicate_data_socket_is_not_inserted() {
        let mut registry = ChannelRegistry::default();
        let mut first = ChannelEntry::default();
        first.set_data_socket(Some(addr(4000)));
        registry.insert(addr(9000), first);

        let mut second = ChannelEntry::default();
        second.set_data_socket(Some(addr(4000)));
        registry.insert(addr(9001), second);

        assert!(registry.contains(&addr(9000)));
        assert!(!registry.contains(&addr(9001)));
    }
}
