//! Client registry using Actor pattern.
//!
//! The registry is the single source of truth for which clients are
//! connected. It assigns ids, stores display names, and hands out the
//! outboxes the broadcaster delivers through.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  RegistryCommand  ┌─────────────────┐
//! │ Session (n)     │──────────────────▶│  RegistryActor  │
//! └─────────────────┘   (mpsc channel)  └────────┬────────┘
//!         ▲                                      │
//!         │  oneshot reply                       ▼
//!         └───────────────────────────  BTreeMap<ClientId,
//!                                           ClientRef>
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use tokio::sync::mpsc;

mod actor;
mod commands;
mod handle;

pub use actor::{RegistryActor, RegistryConfig};
pub use commands::{ClientRef, RegistryCommand, RegistryError};
pub use handle::RegistryHandle;

/// Command channel buffer size
const COMMAND_BUFFER: usize = 100;

/// Spawn the registry actor and return a handle for interaction.
///
/// The actor stops once every handle has been dropped.
///
/// # Example
///
/// ```no_run
/// use relayd::registry::{spawn_registry, RegistryConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let handle = spawn_registry(RegistryConfig::default());
///     let active = handle.count().await;
/// }
/// ```
pub fn spawn_registry(config: RegistryConfig) -> RegistryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

    let actor = RegistryActor::new(cmd_rx, config);
    tokio::spawn(actor.run());

    RegistryHandle::new(cmd_tx)
}
