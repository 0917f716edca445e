//! Registry actor commands, errors, and entries.
//!
//! This module defines the message types for communicating with the `RegistryActor`:
//! - `RegistryCommand`: Commands sent to the actor
//! - `RegistryError`: Errors that can occur during registry operations
//! - `ClientRef`: What lookups and snapshots hand out for each client
//!
//! All types are designed for async message passing and follow the panic-free policy.

use std::net::SocketAddr;

use relay_core::{ClientId, ClientInfo, DisplayName};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::outbox::Outbox;

// ============================================================================
// Client Reference
// ============================================================================

/// A point-in-time view of one registered client.
///
/// The info is a copy: a rename after the lookup is not reflected. The
/// outbox stays usable after the client leaves, but deliveries then fail
/// with `DeliveryError::Disconnected`.
#[derive(Debug, Clone)]
pub struct ClientRef {
    /// Identity and display name at the time of the lookup
    pub info: ClientInfo,

    /// Queue feeding the client's connection
    pub outbox: Outbox,
}

impl ClientRef {
    /// Returns the client's id.
    pub fn id(&self) -> ClientId {
        self.info.id
    }
}

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the registry actor.
///
/// Each command uses a oneshot channel for the response, enabling
/// request-response patterns in async code without blocking.
///
/// # Usage
///
/// ```ignore
/// let (tx, rx) = oneshot::channel();
/// registry_tx.send(RegistryCommand::Lookup {
///     client_id: id,
///     respond_to: tx,
/// }).await?;
/// let client = rx.await?;
/// ```
#[derive(Debug)]
pub enum RegistryCommand {
    /// Admit a new client, assigning it the next id.
    ///
    /// # Errors
    /// - `RegistryError::RegistryFull` if at maximum capacity
    /// - `RegistryError::IdsExhausted` if the id counter has run out
    Register {
        /// Peer address captured at accept time
        remote_addr: SocketAddr,
        /// Queue feeding the new client's connection
        outbox: Outbox,
        /// Channel to send the result
        respond_to: oneshot::Sender<Result<ClientInfo, RegistryError>>,
    },

    /// Remove a client. Removing an absent id is a no-op.
    ///
    /// Responds with `true` if an entry was removed.
    Remove {
        /// ID of the client to remove
        client_id: ClientId,
        /// Channel to send the result
        respond_to: oneshot::Sender<bool>,
    },

    /// Change a client's display name.
    ///
    /// Responds with the previous name.
    ///
    /// # Errors
    /// - `RegistryError::ClientNotFound` if the client is not registered
    Rename {
        /// ID of the client to rename
        client_id: ClientId,
        /// The new display name
        name: DisplayName,
        /// Channel to send the result
        respond_to: oneshot::Sender<Result<DisplayName, RegistryError>>,
    },

    /// Get a single client by ID.
    ///
    /// Returns `None` if the client isn't registered.
    Lookup {
        /// ID of the client to retrieve
        client_id: ClientId,
        /// Channel to send the result
        respond_to: oneshot::Sender<Option<ClientRef>>,
    },

    /// Get every registered client, ordered by id.
    Snapshot {
        /// Channel to send the results
        respond_to: oneshot::Sender<Vec<ClientRef>>,
    },

    /// Get the number of registered clients.
    Count {
        /// Channel to send the result
        respond_to: oneshot::Sender<usize>,
    },
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The registry has reached its maximum client capacity.
    #[error("registry is full (max: {max} clients)")]
    RegistryFull {
        /// Maximum number of clients allowed
        max: usize,
    },

    /// The requested client was not found.
    #[error("client not found: {0}")]
    ClientNotFound(ClientId),

    /// Every id the counter can produce has been handed out.
    #[error("client id space exhausted")]
    IdsExhausted,

    /// The response channel was closed before receiving a response.
    ///
    /// This typically indicates the actor was shut down.
    #[error("response channel closed")]
    ChannelClosed,
}
