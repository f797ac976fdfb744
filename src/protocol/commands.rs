//! Gateway command parsing
//!
//! Defines the wire commands the file-transfer gateway accepts and the data
//! structures describing their outcome.

/// Represents a command parsed from client input.
///
/// Commands that require arguments store them as `String` variants.
#[derive(Debug, PartialEq)]
pub enum Command {
    QUIT,
    LIST,
    LOGOUT,
    PWD,
    CWD(String),  // Change working directory
    CDUP,         // Change to parent directory
    USER(String), // Username for login
    PASS(String), // Password for login
    RETR(String), // Retrieve/download file
    STOR(String), // Store/upload file
    DEL(String),  // Delete file
    MKD(String),  // Make directory
    PORT(String), // Active mode data port specification
    PASV,         // Enter passive mode
    UNKNOWN,      // Unknown or unsupported command
}

/// Represents the outcome status of executing a command.
pub enum CommandStatus {
    Success,
    Failure(String),
    CloseConnection,
}

/// Struct encapsulating the full result of a command execution.
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: Option<String>,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Success,
            message: Some(message.into()),
        }
    }

    pub fn failure(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Failure(reason.into()),
            message: Some(message.into()),
        }
    }
}

/// Parses a raw command line received from a client into the `Command` enum.
///
/// Validates required arguments and returns `UNKNOWN` if a known command is
/// misused.
pub fn parse_command(raw: &str) -> Command {
    let trimmed = raw.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("").to_ascii_uppercase();
    let arg = parts.next().unwrap_or("").trim();

    match cmd.as_str() {
        "QUIT" => Command::QUIT,
        "LIST" => Command::LIST,
        "LOGOUT" => Command::LOGOUT,
        "PWD" => Command::PWD,
        "CDUP" => Command::CDUP,
        "CWD" if !arg.is_empty() => Command::CWD(arg.to_string()),
        "USER" if !arg.is_empty() => Command::USER(arg.to_string()),
        "PASS" if !arg.is_empty() => Command::PASS(arg.to_string()),
        "RETR" if !arg.is_empty() => Command::RETR(arg.to_string()),
        "STOR" if !arg.is_empty() => Command::STOR(arg.to_string()),
        "DEL" if !arg.is_empty() => Command::DEL(arg.to_string()),
        "DELE" if !arg.is_empty() => Command::DEL(arg.to_string()),
        "MKD" if !arg.is_empty() => Command::MKD(arg.to_string()),
        "PORT" if !arg.is_empty() => Command::PORT(arg.to_string()),
        "PASV" => Command::PASV,
        _ => Command::UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_case_insensitively() {
        assert_eq!(parse_command("pwd"), Command::PWD);
        assert_eq!(parse_command("Quit"), Command::QUIT);
        assert_eq!(parse_command("pasv"), Command::PASV);
    }

    #[test]
    fn arguments_are_captured() {
        assert_eq!(
            parse_command("CWD team-a/docs"),
            Command::CWD("team-a/docs".to_string())
        );
        assert_eq!(parse_command("USER casey"), Command::USER("casey".to_string()));
        assert_eq!(
            parse_command("RETR notes with spaces.md"),
            Command::RETR("notes with spaces.md".to_string())
        );
    }

    #[test]
    fn missing_required_argument_is_unknown() {
        assert_eq!(parse_command("CWD"), Command::UNKNOWN);
        assert_eq!(parse_command("USER "), Command::UNKNOWN);
        assert_eq!(parse_command("RETR"), Command::UNKNOWN);
    }

    #[test]
    fn unrecognized_input_is_unknown() {
        assert_eq!(parse_command("NOOP"), Command::UNKNOWN);
        assert_eq!(parse_command(""), Command::UNKNOWN);
    }
}
