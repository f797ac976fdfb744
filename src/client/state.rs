//! Module `client`
//!
//! Defines the `Client` struct tracking per-connection gateway state: the
//! authenticated session's confined root, the virtual working directory, and
//! data channel initialization. No two connections share a `Client`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::auth::Session;
use crate::sandbox;

/// Per-connection state for one gateway client.
pub struct Client {
    username: Option<String>,
    client_addr: Option<SocketAddr>,
    session_root: Option<PathBuf>,
    virtual_cwd: String,
    blocked_dirs: Vec<String>,
    is_logged_in: bool,
    is_data_channel_init: bool,
}

impl Default for Client {
    fn default() -> Self {
        Self {
            username: None,
            client_addr: None,
            session_root: None,
            virtual_cwd: "/".to_string(),
            blocked_dirs: sandbox::BLOCKED_DIRS.iter().map(|s| s.to_string()).collect(),
            is_logged_in: false,
            is_data_channel_init: false,
        }
    }
}

impl Client {
    /// Binds an authenticated session to this connection: confined root,
    /// working directory reset to `/`.
    pub fn attach_session(&mut self, session: Session) {
        self.username = Some(session.username);
        self.session_root = Some(session.root);
        self.virtual_cwd = session.cwd;
        self.is_logged_in = true;
    }

    /// Resets the client state, logging out and clearing all session data.
    pub fn logout(&mut self) {
        self.username = None;
        self.session_root = None;
        self.virtual_cwd = "/".to_string();
        self.is_logged_in = false;
        self.is_data_channel_init = false;
    }

    /// True when any segment of the virtual path names a blocked directory.
    pub fn is_path_blocked(&self, virtual_path: &str) -> bool {
        sandbox::is_blocked(virtual_path, &self.blocked_dirs)
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    pub fn is_data_channel_init(&self) -> bool {
        self.is_data_channel_init
    }

    pub fn username(&self) -> Option<&String> {
        self.username.as_ref()
    }

    pub fn client_addr(&self) -> Option<&SocketAddr> {
        self.client_addr.as_ref()
    }

    /// The confined root every operation on this connection is scoped to.
    pub fn session_root(&self) -> Option<&Path> {
        self.session_root.as_deref()
    }

    pub fn virtual_cwd(&self) -> &str {
        &self.virtual_cwd
    }

    // --------------------
    // Setter methods
    // --------------------

    pub fn set_data_channel_init(&mut self, init: bool) {
        self.is_data_channel_init = init;
    }

    pub fn set_client_addr(&mut self, addr: Option<SocketAddr>) {
        self.client_addr = addr;
    }

    pub fn set_virtual_cwd(&mut self, path: String) {
        self.virtual_cwd = path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_session_resets_cwd_and_marks_login() {
        let mut client = Client::default();
        client.set_virtual_cwd("/stale".to_string());
        client.attach_session(Session {
            username: "casey".to_string(),
            root: PathBuf::from("/srv/workspaces/team-a"),
            cwd: "/".to_string(),
        });

        assert!(client.is_logged_in());
        assert_eq!(client.virtual_cwd(), "/");
        assert_eq!(
            client.session_root(),
            Some(Path::new("/srv/workspaces/team-a"))
        );
    }

    #[test]
    fn logout_clears_session_state() {
        let mut client = Client::default();
        client.attach_session(Session {
            username: "casey".to_string(),
            root: PathBuf::from("/srv/workspaces/team-a"),
            cwd: "/".to_string(),
        });
        client.logout();

        assert!(!client.is_logged_in());
        assert!(client.session_root().is_none());
        assert_eq!(client.virtual_cwd(), "/");
    }

    #[test]
    fn default_blocklist_covers_version_control_metadata() {
        let client = Client::default();
        assert!(client.is_path_blocked("/project/.git/config"));
        assert!(client.is_path_blocked("/node_modules"));
        assert!(!client.is_path_blocked("/project/src"));
    }
}
