//! Relay Protocol - Line-oriented wire protocol
//!
//! This crate provides parsing of inbound chat lines into commands,
//! the texts of every server notice, outbound message routing, and the
//! bounded line codec used on the TCP stream.

pub mod codec;
pub mod command;
pub mod message;
pub mod notice;

pub use codec::{ChatLineCodec, CodecError};
pub use command::{parse_command, strip_line_ending, Command, CommandError, SENTINEL};
pub use message::{MessageKind, OutboundMessage, Routing};
