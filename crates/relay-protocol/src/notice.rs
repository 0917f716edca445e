//! Texts of every server-to-client line.
//!
//! Clients match on these exact strings, so they are kept in one place.

use relay_core::{ClientId, DisplayName};

use crate::CommandError;

/// Command summary, one line per command.
pub const HELP_LINES: [&str; 6] = [
    "\\QUIT     Quit chatroom",
    "\\PING     Server test",
    "\\NAME     <name> Change nickname",
    "\\PRIVATE  <reference> <message> Send private message",
    "\\ACTIVE   Show active clients",
    "\\HELP     Show help",
];

pub const PONG: &str = "<<PONG";
pub const UNKNOWN_COMMAND: &str = "<<UNKNOWN COMMAND";
pub const MAX_CLIENTS_REACHED: &str = "<<MAX CLIENTS REACHED";

pub fn join(name: &DisplayName) -> String {
    format!("<<JOIN, HELLO {name}")
}

pub fn leave(name: &DisplayName) -> String {
    format!("<<LEAVE, BYE {name}")
}

pub fn rename(old: &DisplayName, new: &DisplayName) -> String {
    format!("<<RENAME, {old} TO {new}")
}

pub fn chat(name: &DisplayName, text: &str) -> String {
    format!("[{name}] {text}")
}

pub fn private(name: &DisplayName, text: &str) -> String {
    format!("[PM][{name}] {text}")
}

/// Header line of an active-client listing.
pub fn active_header(count: usize) -> String {
    format!("<<CLIENTS {count}")
}

/// One entry of an active-client listing.
pub fn active_entry(id: ClientId, name: &DisplayName) -> String {
    format!("<<CLIENT {id} | {name}")
}

/// Self-notice for a command with missing arguments.
pub fn usage_error(err: CommandError) -> String {
    format!("<<{}", err.to_string().to_uppercase())
}
