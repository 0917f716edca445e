//! Inbound command parsing.
//!
//! Parsing is a pure function of the line: no registry or session state is
//! consulted. Whether a private-message target actually exists is decided
//! later, when the message is routed.

use relay_core::ClientId;
use thiserror::Error;

/// Leading character that marks a line as a command.
pub const SENTINEL: char = '\\';

/// A parsed inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `\QUIT` - leave the chat
    Quit,

    /// `\PING` - liveness check, answered with a pong
    Ping,

    /// `\NAME <name>` - change display name
    Rename(String),

    /// `\PRIVATE <id> <message...>` - message a single client
    PrivateMessage {
        /// Target id. `None` when the reference is not a number; such a
        /// target never resolves to a client.
        target: Option<ClientId>,
        /// Message tokens rejoined with single spaces
        body: String,
    },

    /// `\ACTIVE` - list connected clients
    ListActive,

    /// `\HELP` - show the command summary
    Help,

    /// Any other sentinel-prefixed verb
    Unknown(String),

    /// A line that is not a command
    PlainChat(String),
}

/// Usage errors for known commands with missing arguments.
///
/// The display text is what the issuing client is told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("name cannot be empty")]
    EmptyName,

    #[error("reference cannot be empty")]
    EmptyReference,

    #[error("message cannot be empty")]
    EmptyMessage,
}

/// Cuts a raw line at its first CR or LF.
pub fn strip_line_ending(raw: &str) -> &str {
    raw.split(|c: char| c == '\r' || c == '\n').next().unwrap_or_default()
}

/// Parses a stripped, non-empty line.
///
/// Lines that do not start with [`SENTINEL`] are chat. Verbs are
/// case-sensitive; arguments are whitespace-separated.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    if !line.starts_with(SENTINEL) {
        return Ok(Command::PlainChat(line.to_string()));
    }

    let mut tokens = line.split_whitespace();
    let verb = tokens.next().unwrap_or_default();

    match verb {
        "\\QUIT" => Ok(Command::Quit),
        "\\PING" => Ok(Command::Ping),
        "\\NAME" => tokens
            .next()
            .map(|name| Command::Rename(name.to_string()))
            .ok_or(CommandError::EmptyName),
        "\\PRIVATE" => {
            let reference = tokens.next().ok_or(CommandError::EmptyReference)?;
            let body = tokens.collect::<Vec<_>>().join(" ");
            if body.is_empty() {
                return Err(CommandError::EmptyMessage);
            }
            Ok(Command::PrivateMessage {
                target: reference.parse().ok(),
                body,
            })
        }
        "\\ACTIVE" => Ok(Command::ListActive),
        "\\HELP" => Ok(Command::Help),
        other => Ok(Command::Unknown(other.to_string())),
    }
}
