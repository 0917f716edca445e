//! relay daemon - Client registry, sessions and broadcast
//!
//! This crate provides the core infrastructure for the chat relay:
//! - `registry` - Client registry actor owning the set of active clients
//! - `broadcaster` - Recipient resolution and per-recipient delivery
//! - `server` - TCP accept loop and per-connection sessions
//! - `config` - Runtime configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        relayd                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │   ChatServer    │────▶│       RegistryActor         │   │
//! │  │ (TcpListener)   │     │  (owns active clients)      │   │
//! │  └────────┬────────┘     └──────────────▲──────────────┘   │
//! │           │ accept                      │ snapshot/lookup   │
//! │           ▼                             │                   │
//! │  ┌─────────────────┐     ┌──────────────┴──────────────┐   │
//! │  │    Session      │────▶│        Broadcaster          │   │
//! │  │  (per client)   │     │  (enqueue per recipient)    │   │
//! │  └────────┬────────┘     └──────────────┬──────────────┘   │
//! │           │ owns                        │ try_send          │
//! │           ▼                             ▼                   │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │ ConnectionHandle│◀────│   Outbox (bounded queue)    │   │
//! │  │ reader + writer │     │                             │   │
//! │  └─────────────────┘     └─────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod broadcaster;
pub mod config;
pub mod outbox;
pub mod registry;
pub mod server;
