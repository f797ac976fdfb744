//! Command handlers for the file gateway.
//!
//! Dispatches parsed commands against the client's session. Every path
//! operand resolves through the session's confined root and the directory
//! blocklist before any filesystem access; a rejected path fails the command
//! and leaves session state untouched.

use log::{error, info};
use std::fs;
use std::io::Write;
use std::net::{SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::client::Client;
use crate::config::StartupConfig;
use crate::protocol::{Command, CommandResult, CommandStatus};
use crate::sandbox::{resolve_operand, resolve_virtual, to_real};
use crate::transfer::setup_data_stream;
use crate::transfer::{ChannelEntry, ChannelRegistry};
use crate::transfer::{handle_file_download, handle_file_upload};

/// Dispatches a received command to its corresponding handler.
pub fn handle_command(
    client: &mut Client,
    command: &Command,
    channel_registry: &mut ChannelRegistry,
    config: &StartupConfig,
    advertised: &str,
) -> CommandResult {
    match command {
        Command::QUIT => handle_cmd_quit(client),
        Command::USER(_) | Command::PASS(_) => {
            CommandResult::failure("Already logged in", "503 Already logged in\r\n")
        }
        Command::LIST => handle_cmd_list(client, channel_registry),
        Command::PWD => handle_cmd_pwd(client),
        Command::LOGOUT => handle_cmd_logout(client),
        Command::CWD(path) => handle_cmd_cwd(client, path),
        Command::CDUP => handle_cmd_cwd(client, ".."),
        Command::RETR(filename) => handle_cmd_retr(client, filename, channel_registry),
        Command::STOR(filename) => handle_cmd_stor(client, filename, channel_registry, config),
        Command::DEL(filename) => handle_cmd_del(client, filename),
        Command::MKD(path) => handle_cmd_mkd(client, path),
        Command::PASV => handle_cmd_pasv(client, channel_registry, config, advertised),
        Command::PORT(addr) => handle_cmd_port(client, channel_registry, addr),
        Command::UNKNOWN => handle_cmd_unknown(),
    }
}

fn not_logged_in() -> CommandResult {
    CommandResult::failure("Not logged in", "530 Not logged in\r\n")
}

/// Resolves a path operand against the client's session: virtual resolution,
/// blocklist, confinement. Any failure maps to one opaque `550` so responses
/// disclose nothing about the real filesystem.
fn resolve_client_path(client: &Client, operand: &str) -> Result<(PathBuf, String), CommandResult> {
    let root = client
        .session_root()
        .ok_or_else(|| CommandResult::failure("No session root", "500 Internal server error\r\n"))?;

    let (real_path, virtual_path) = resolve_operand(root, client.virtual_cwd(), operand)
        .map_err(|e| {
            error!("path resolution rejected: {}", e);
            CommandResult::failure("Invalid path", "550 Invalid path\r\n")
        })?;

    if client.is_path_blocked(&virtual_path) {
        return Err(CommandResult::failure("Invalid path", "550 Invalid path\r\n"));
    }

    Ok((real_path, virtual_path))
}

/// Handles the QUIT command: logs out the client and signals connection close.
fn handle_cmd_quit(client: &mut Client) -> CommandResult {
    client.logout();

    CommandResult {
        status: CommandStatus::CloseConnection,
        message: Some("221 Goodbye\r\n".into()),
    }
}

/// Handles the LOGOUT command: logs out the client if currently logged in.
fn handle_cmd_logout(client: &mut Client) -> CommandResult {
    if client.is_logged_in() {
        client.logout();
        CommandResult::success("221 Logout successful\r\n")
    } else {
        not_logged_in()
    }
}

/// Handles the PWD command: returns the current virtual directory.
fn handle_cmd_pwd(client: &Client) -> CommandResult {
    if !client.is_logged_in() {
        return not_logged_in();
    }

    CommandResult::success(format!("257 \"{}\"\r\n", client.virtual_cwd()))
}

/// Handles the CWD command: changes the client's virtual working directory.
///
/// The target must resolve inside the session root and exist as a directory;
/// otherwise the working directory is left unchanged.
fn handle_cmd_cwd(client: &mut Client, path: &str) -> CommandResult {
    if !client.is_logged_in() {
        return not_logged_in();
    }

    let root = match client.session_root() {
        Some(root) => root,
        None => return CommandResult::failure("No session root", "500 Internal server error\r\n"),
    };

    let new_virtual = match resolve_virtual(client.virtual_cwd(), path) {
        Ok(path) => path,
        Err(e) => {
            error!("CWD path resolution rejected: {}", e);
            return CommandResult::failure("Invalid path", "550 Invalid path\r\n");
        }
    };

    if client.is_path_blocked(&new_virtual) {
        return CommandResult::failure("Invalid path", "550 Invalid path\r\n");
    }

    let real_path = match to_real(root, &new_virtual) {
        Ok(path) => path,
        Err(e) => {
            error!("CWD confinement rejected: {}", e);
            return CommandResult::failure("Invalid path", "550 Invalid path\r\n");
        }
    };

    if !real_path.is_dir() {
        return CommandResult::failure(
            "Directory not found",
            format!("550 {}: Directory not found\r\n", new_virtual),
        );
    }

    client.set_virtual_cwd(new_virtual.clone());

    info!(
        "Client {} changed directory to {}",
        client_label(client),
        new_virtual
    );

    CommandResult::success("250 Directory changed successfully\r\n")
}

/// Handles the LIST command: sends the working directory listing over the
/// data channel. Blocked directory names are omitted.
fn handle_cmd_list(client: &mut Client, channel_registry: &mut ChannelRegistry) -> CommandResult {
    if !client.is_logged_in() {
        return not_logged_in();
    }

    if !client.is_data_channel_init() {
        return CommandResult::failure(
            "Data channel not initialized",
            "530 Data channel not initialized\r\n",
        );
    }

    let client_addr = match client.client_addr() {
        Some(addr) => *addr,
        None => return CommandResult::failure("Client address unknown", "500 Internal server error\r\n"),
    };

    let root = match client.session_root() {
        Some(root) => root.to_path_buf(),
        None => return CommandResult::failure("No session root", "500 Internal server error\r\n"),
    };

    let real_path = match to_real(&root, client.virtual_cwd()) {
        Ok(path) => path,
        Err(e) => {
            error!("LIST confinement rejected: {}", e);
            return CommandResult::failure("Invalid path", "550 Invalid path\r\n");
        }
    };

    let entries = match fs::read_dir(&real_path) {
        Ok(entries) => entries,
        Err(e) => {
            error!(
                "Failed to list directory {} (real: {}): {}",
                client.virtual_cwd(),
                real_path.display(),
                e
            );
            return CommandResult::failure(e.to_string(), "550 Failed to list directory\r\n");
        }
    };

    let mut file_list = vec![".".to_string()];
    if client.virtual_cwd() != "/" {
        file_list.push("..".to_string());
    }

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        let child_virtual = format!("{}/{}", client.virtual_cwd().trim_end_matches('/'), name);
        if client.is_path_blocked(&child_virtual) {
            continue;
        }
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        file_list.push(if is_dir { format!("{}/", name) } else { name });
    }

    info!(
        "Client {} listed directory {} - {} entries",
        client_addr,
        client.virtual_cwd(),
        file_list.len()
    );

    let mut data_stream = match setup_data_stream(channel_registry, &client_addr) {
        Some(stream) => stream,
        None => {
            error!("Failed to establish data connection for client {}", client_addr);
            return CommandResult::failure(
                "Can't open data connection",
                "425 Can't open data connection\r\n",
            );
        }
    };

    let listing_data = file_list.join("\r\n") + "\r\n";
    let sent = data_stream
        .write_all(listing_data.as_bytes())
        .and_then(|_| data_stream.flush());

    cleanup_data_channel(client, channel_registry, &client_addr);

    match sent {
        Ok(_) => CommandResult::success("226 Directory send OK\r\n"),
        Err(e) => {
            error!("Failed to send directory listing: {}", e);
            CommandResult::failure(
                "Connection closed; transfer aborted",
                "426 Connection closed; transfer aborted\r\n",
            )
        }
    }
}

/// Handles the RETR command: downloads a file from the session root to the
/// client over the data channel.
fn handle_cmd_retr(
    client: &mut Client,
    filename: &str,
    channel_registry: &mut ChannelRegistry,
) -> CommandResult {
    if !client.is_logged_in() {
        return not_logged_in();
    }

    if !client.is_data_channel_init() {
        return CommandResult::failure(
            "Data channel not initialized",
            "530 Data channel not initialized\r\n",
        );
    }

    let (file_path, virtual_file_path) = match resolve_client_path(client, filename) {
        Ok(resolved) => resolved,
        Err(result) => return result,
    };

    if !file_path.is_file() {
        return CommandResult::failure(
            "File not found",
            format!("550 {}: File not found\r\n", virtual_file_path),
        );
    }

    let client_addr = match client.client_addr() {
        Some(addr) => *addr,
        None => return CommandResult::failure("Client address unknown", "500 Internal server error\r\n"),
    };

    info!(
        "Client {} retrieving {} (virtual: {})",
        client_addr, filename, virtual_file_path
    );

    let data_stream = match setup_data_stream(channel_registry, &client_addr) {
        Some(stream) => stream,
        None => {
            error!("Failed to establish data connection for client {}", client_addr);
            return CommandResult::failure(
                "Can't open data connection",
                "425 Can't open data connection\r\n",
            );
        }
    };

    let outcome = handle_file_download(data_stream, &file_path);
    cleanup_data_channel(client, channel_registry, &client_addr);

    match outcome {
        Ok((status, msg)) | Err((status, msg)) => CommandResult {
            status,
            message: Some(msg.into()),
        },
    }
}

/// Handles the STOR command: uploads a file from the client into the session
/// root, via a temporary file renamed into place.
fn handle_cmd_stor(
    client: &mut Client,
    filename: &str,
    channel_registry: &mut ChannelRegistry,
    config: &StartupConfig,
) -> CommandResult {
    if !client.is_logged_in() {
        return not_logged_in();
    }

    if !client.is_data_channel_init() {
        return CommandResult::failure(
            "Data channel not initialized",
            "530 Data channel not initialized\r\n",
        );
    }

    let (file_path, virtual_file_path) = match resolve_client_path(client, filename) {
        Ok(resolved) => resolved,
        Err(result) => return result,
    };

    // Parent must already exist; STOR does not create directories.
    if let Some(parent_dir) = file_path.parent() {
        if !parent_dir.is_dir() {
            return CommandResult::failure("Directory not found", "550 Directory not found\r\n");
        }
    }

    // First-come-first-served: no overwrite of finished or in-flight uploads.
    if file_path.exists() {
        return CommandResult::failure(
            "File exists",
            format!("550 {}: File already exists\r\n", virtual_file_path),
        );
    }

    let temp_path = temp_upload_path(&file_path);
    if temp_path.exists() {
        return CommandResult::failure(
            "File upload in progress",
            "550 File is currently being uploaded by another client\r\n",
        );
    }

    let client_addr = match client.client_addr() {
        Some(addr) => *addr,
        None => return CommandResult::failure("Client address unknown", "500 Internal server error\r\n"),
    };

    info!(
        "Client {} storing {} (virtual: {})",
        client_addr, filename, virtual_file_path
    );

    let data_stream = match setup_data_stream(channel_registry, &client_addr) {
        Some(stream) => stream,
        None => {
            error!("Failed to establish data connection for client {}", client_addr);
            return CommandResult::failure(
                "Can't open data connection",
                "425 Can't open data connection\r\n",
            );
        }
    };

    let outcome = handle_file_upload(
        data_stream,
        &file_path,
        &temp_path,
        config.max_file_size_bytes(),
    );
    cleanup_data_channel(client, channel_registry, &client_addr);

    match outcome {
        Ok((status, msg)) | Err((status, msg)) => CommandResult {
            status,
            message: Some(msg.into()),
        },
    }
}

/// Handles the DEL command: deletes a file inside the session root.
fn handle_cmd_del(client: &mut Client, filename: &str) -> CommandResult {
    if !client.is_logged_in() {
        return not_logged_in();
    }

    let (file_path, virtual_file_path) = match resolve_client_path(client, filename) {
        Ok(resolved) => resolved,
        Err(result) => return result,
    };

    if !file_path.exists() {
        return CommandResult::failure(
            "File not found",
            format!("550 {}: File not found\r\n", virtual_file_path),
        );
    }

    if !file_path.is_file() {
        return CommandResult::failure(
            "Not a file",
            format!("550 {}: Not a file\r\n", virtual_file_path),
        );
    }

    match fs::remove_file(&file_path) {
        Ok(_) => {
            info!(
                "Client {} deleted {} (virtual: {})",
                client_label(client),
                filename,
                virtual_file_path
            );
            CommandResult::success("250 File deleted successfully\r\n")
        }
        Err(e) => {
            error!(
                "Failed to delete {} (virtual: {}): {}",
                filename, virtual_file_path, e
            );
            CommandResult::failure(
                e.to_string(),
                format!("550 {}: Failed to delete file\r\n", virtual_file_path),
            )
        }
    }
}

/// Handles the MKD command: creates a directory inside the session root.
fn handle_cmd_mkd(client: &mut Client, path: &str) -> CommandResult {
    if !client.is_logged_in() {
        return not_logged_in();
    }

    let (dir_path, virtual_dir_path) = match resolve_client_path(client, path) {
        Ok(resolved) => resolved,
        Err(result) => return result,
    };

    if dir_path.exists() {
        return CommandResult::failure(
            "Already exists",
            format!("550 {}: Already exists\r\n", virtual_dir_path),
        );
    }

    match fs::create_dir_all(&dir_path) {
        Ok(_) => {
            info!(
                "Client {} created directory {}",
                client_label(client),
                virtual_dir_path
            );
            CommandResult::success(format!("257 \"{}\" created\r\n", virtual_dir_path))
        }
        Err(e) => {
            error!("Failed to create directory {}: {}", virtual_dir_path, e);
            CommandResult::failure(
                e.to_string(),
                format!("550 {}: Failed to create directory\r\n", virtual_dir_path),
            )
        }
    }
}

/// Handles the PASV command: binds a listener from the configured data port
/// range and tells the client where to connect.
fn handle_cmd_pasv(
    client: &mut Client,
    channel_registry: &mut ChannelRegistry,
    config: &StartupConfig,
    advertised: &str,
) -> CommandResult {
    if !client.is_logged_in() {
        return not_logged_in();
    }

    let client_addr = match client.client_addr() {
        Some(addr) => *addr,
        None => return CommandResult::failure("Client address unknown", "500 Internal server error\r\n"),
    };

    // Drop any previous data channel before setting up a new one.
    if channel_registry.contains(&client_addr) {
        cleanup_data_channel(client, channel_registry, &client_addr);
    }

    let data_socket = match channel_registry
        .next_available_socket(&config.bind_address, config.data_port_range())
    {
        Some(socket) => socket,
        None => {
            return CommandResult::failure(
                "No available port",
                "425 Can't open data connection\r\n",
            );
        }
    };

    match TcpListener::bind(data_socket) {
        Ok(listener) => {
            // Non-blocking so a client that never connects cannot pin the
            // session; the accept path polls with backoff.
            if let Err(e) = listener.set_nonblocking(true) {
                error!("Failed to set non-blocking mode: {}", e);
                return CommandResult::failure(
                    "Failed to configure listener",
                    "425 Can't open data connection\r\n",
                );
            }

            let mut entry = ChannelEntry::default();
            entry.set_data_socket(Some(data_socket));
            entry.set_listener(Some(listener));
            entry.set_owner_ip(Some(client_addr.ip()));

            channel_registry.insert(client_addr, entry);
            client.set_data_channel_init(true);

            info!(
                "Client {} bound to data socket {} in passive mode",
                client_addr, data_socket
            );

            CommandResult::success(format!(
                "227 Entering Passive Mode ({}:{})\r\n",
                advertised,
                data_socket.port()
            ))
        }
        Err(e) => {
            error!("Failed to bind to {}: {}", data_socket, e);
            CommandResult::failure("Port binding failed", "425 Can't open data connection\r\n")
        }
    }
}

/// Handles the PORT command: records the client's data socket for active
/// mode. The address must match the control connection's peer IP and use a
/// non-privileged port.
fn handle_cmd_port(
    client: &mut Client,
    channel_registry: &mut ChannelRegistry,
    addr: &str,
) -> CommandResult {
    if !client.is_logged_in() {
        return not_logged_in();
    }

    let client_addr = match client.client_addr() {
        Some(addr) => *addr,
        None => return CommandResult::failure("Client address unknown", "500 Internal server error\r\n"),
    };

    let parsed_addr = match SocketAddr::from_str(addr) {
        Ok(addr) => addr,
        Err(_) => {
            return CommandResult::failure(
                "Invalid address format",
                "501 Invalid address format. Use IP:PORT\r\n",
            );
        }
    };

    if parsed_addr.ip() != client_addr.ip() {
        return CommandResult::failure(
            "IP mismatch",
            "501 IP address in PORT must match control connection\r\n",
        );
    }

    if parsed_addr.port() < 1024 {
        return CommandResult::failure(
            "Port out of range",
            "501 Port must be between 1024 and 65535\r\n",
        );
    }

    if channel_registry.contains(&client_addr) {
        cleanup_data_channel(client, channel_registry, &client_addr);
    }

    let mut entry = ChannelEntry::default();
    entry.set_data_socket(Some(parsed_addr));
    entry.set_owner_ip(Some(client_addr.ip()));

    channel_registry.insert(client_addr, entry);
    client.set_data_channel_init(true);

    info!(
        "Client {} registered data socket {} in active mode",
        client_addr, parsed_addr
    );

    CommandResult::success("200 PORT command successful\r\n")
}

/// Handles unknown or unsupported commands.
fn handle_cmd_unknown() -> CommandResult {
    CommandResult::failure(
        "Unknown command",
        "500 Syntax error, command unrecognized\r\n",
    )
}

/// Upload staging file alongside the final destination; hidden so it never
/// shows up in workspace trees.
fn temp_upload_path(final_path: &Path) -> PathBuf {
    let name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    final_path.with_file_name(format!(".{}.tmp", name))
}

/// Cleans up data channel resources for a client after a transfer.
fn cleanup_data_channel(
    client: &mut Client,
    channel_registry: &mut ChannelRegistry,
    client_addr: &SocketAddr,
) {
    channel_registry.cleanup_all(client_addr);
    client.set_data_channel_init(false);
}

fn client_label(client: &Client) -> String {
    client
        .client_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
