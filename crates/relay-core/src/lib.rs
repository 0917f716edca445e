//! Relay Core - Shared domain types for the chat relay
//!
//! This crate provides the domain types shared between the wire
//! protocol (relay-protocol) and the server (relayd).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod client;
pub mod error;
pub mod limits;
pub mod state;

// Re-exports for convenience
pub use client::{ClientId, ClientInfo, DisplayName};
pub use error::{DomainError, DomainResult};
pub use limits::truncate_utf8;
pub use state::SessionState;
