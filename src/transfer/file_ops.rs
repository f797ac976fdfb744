//! Module `file_ops`
//!
//! File upload and download over established data streams. Uploads land in a
//! temporary file and are renamed into place so a dropped connection never
//! leaves a half-written final file.

use log::{error, info};
use std::fs::{File, remove_file, rename};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;

use crate::protocol::CommandStatus;

const BUFFER_SIZE: usize = 8192;

/// Receives a file from the client into `temp_path`, then renames it to
/// `final_path` on success. The transfer is capped at `max_bytes`.
pub fn handle_file_upload(
    mut data_stream: TcpStream,
    final_path: &Path,
    temp_path: &Path,
    max_bytes: u64,
) -> Result<(CommandStatus, &'static str), (CommandStatus, &'static str)> {
    info!(
        "Starting file upload: {} -> {}",
        temp_path.display(),
        final_path.display()
    );

    let mut temp_file = match File::create(temp_path) {
        Ok(file) => file,
        Err(e) => {
            error!("Failed to create temporary file {}: {e}", temp_path.display());
            return Err((
                CommandStatus::Failure("Cannot create file".into()),
                "550 Cannot create file\r\n",
            ));
        }
    };

    let mut buffer = [0; BUFFER_SIZE];
    let mut total_bytes_received = 0u64;

    loop {
        let n = match data_stream.read(&mut buffer) {
            Ok(0) => break, // EOF, upload complete
            Ok(n) => n,
            Err(e) => {
                error!("Read failure during upload: {e}");
                let _ = remove_file(temp_path);
                return Err((
                    CommandStatus::Failure("Connection closed; transfer aborted".into()),
                    "426 Connection closed; transfer aborted\r\n",
                ));
            }
        };

        total_bytes_received += n as u64;
        if total_bytes_received > max_bytes {
            error!("Upload size limit exceeded: {total_bytes_received} > {max_bytes} bytes");
            let _ = remove_file(temp_path);
            return Err((
                CommandStatus::Failure("Insufficient storage space".into()),
                "552 Insufficient storage space (file too large)\r\n",
            ));
        }

        if let Err(e) = temp_file.write_all(&buffer[..n]) {
            error!("Failed to write to temporary file {}: {e}", temp_path.display());
            let _ = remove_file(temp_path);
            return Err((
                CommandStatus::Failure("Insufficient storage space".into()),
                "552 Insufficient storage space\r\n",
            ));
        }
    }

    if let Err(e) = temp_file.flush() {
        error!("Failed to flush temporary file {}: {e}", temp_path.display());
        let _ = remove_file(temp_path);
        return Err((
            CommandStatus::Failure("Requested file action not taken".into()),
            "450 Requested file action not taken\r\n",
        ));
    }
    drop(temp_file);

    match rename(temp_path, final_path) {
        Ok(_) => {
            info!(
                "File upload completed: {} ({total_bytes_received} bytes)",
                final_path.display()
            );
            Ok((CommandStatus::Success, "226 Transfer complete\r\n"))
        }
        Err(e) => {
            error!(
                "Failed to rename {} to {}: {e}",
                temp_path.display(),
                final_path.display()
            );
            let _ = remove_file(temp_path);
            Err((
                CommandStatus::Failure("Requested file action not taken".into()),
                "450 Requested file action not taken\r\n",
            ))
        }
    }
}

/// Streams a file from the server to the client.
pub fn handle_file_download(
    mut data_stream: TcpStream,
    path: &Path,
) -> Result<(CommandStatus, &'static str), (CommandStatus, &'static str)> {
    info!("Starting file download: {}", path.display());

    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            error!("Failed to open file {}: {e}", path.display());
            return Err((
                CommandStatus::Failure("Failed to open file".into()),
                "550 Failed to open file\r\n",
            ));
        }
    };

    let mut buffer = [0; BUFFER_SIZE];
    let mut total_bytes_sent = 0u64;

    loop {
        let n = match file.read(&mut buffer) {
            Ok(0) => break, // EOF
            Ok(n) => n,
            Err(e) => {
                error!("Read error on {}: {e}", path.display());
                return Err((
                    CommandStatus::Failure("Requested action aborted".into()),
                    "451 Requested action aborted\r\n",
                ));
            }
        };

        if let Err(e) = data_stream.write_all(&buffer[..n]) {
            error!("Write failure to data stream: {e}");
            return Err((
                CommandStatus::Failure("Connection closed; transfer aborted".into()),
                "426 Connection closed; transfer aborted\r\n",
            ));
        }

        total_bytes_sent += n as u64;
    }

    if let Err(e) = data_stream.flush() {
        error!("Failed to flush data stream: {e}");
        return Err((
            CommandStatus::Failure("Requested file action not taken".into()),
            "450 Requested file action not taken\r\n",
        ));
    }

    info!(
        "File download completed: {} ({total_bytes_sent} bytes)",
        path.display()
    );

    Ok((CommandStatus::Success, "226 Transfer complete\r\n"))
}
