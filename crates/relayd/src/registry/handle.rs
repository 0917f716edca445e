//! Client interface for interacting with the RegistryActor.
//!
//! The `RegistryHandle` provides a cheap-to-clone interface for sending
//! commands to the registry actor.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Channel errors are mapped to `RegistryError::ChannelClosed`

use std::net::SocketAddr;

use relay_core::{ClientId, ClientInfo, DisplayName};
use tokio::sync::{mpsc, oneshot};

use super::commands::{ClientRef, RegistryCommand, RegistryError};
use crate::outbox::Outbox;

// ============================================================================
// Registry Handle
// ============================================================================

/// Handle for interacting with the registry actor.
///
/// This is a cheap-to-clone handle that can be shared across sessions.
/// All methods are async and communicate with the actor via channels.
///
/// # Usage
///
/// ```ignore
/// let handle = registry_handle.clone();
///
/// let info = handle.register(peer_addr, outbox).await?;
/// let everyone = handle.snapshot().await;
/// handle.remove(info.id).await;
/// ```
#[derive(Clone)]
pub struct RegistryHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Create a new registry handle.
    pub fn new(sender: mpsc::Sender<RegistryCommand>) -> Self {
        Self { sender }
    }

    /// Admit a new client and assign it the next id.
    ///
    /// The returned info carries the assigned id and the default display
    /// name (the decimal id).
    ///
    /// # Errors
    ///
    /// - `RegistryError::RegistryFull` if the registry is at maximum capacity
    /// - `RegistryError::IdsExhausted` if no id is left to assign
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn register(
        &self,
        remote_addr: SocketAddr,
        outbox: Outbox,
    ) -> Result<ClientInfo, RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Register {
                remote_addr,
                outbox,
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    /// Remove a client.
    ///
    /// Returns `true` if the client was registered. Removing an absent
    /// client, or failing to reach the actor, returns `false`.
    pub async fn remove(&self, client_id: ClientId) -> bool {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::Remove {
                client_id,
                respond_to: tx,
            })
            .await
            .is_err()
        {
            return false;
        }

        rx.await.unwrap_or(false)
    }

    /// Change a client's display name, returning the previous one.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ClientNotFound` if the client is not registered
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn rename(
        &self,
        client_id: ClientId,
        name: DisplayName,
    ) -> Result<DisplayName, RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Rename {
                client_id,
                name,
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    /// Get a single client by ID.
    ///
    /// Returns `None` if the client isn't registered or if communication
    /// with the actor fails.
    pub async fn lookup(&self, client_id: ClientId) -> Option<ClientRef> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Lookup {
                client_id,
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok()?
    }

    /// Get every registered client in ascending id order.
    ///
    /// Returns an empty vector if communication with the actor fails.
    pub async fn snapshot(&self) -> Vec<ClientRef> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::Snapshot { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Get the number of registered clients.
    ///
    /// Returns 0 if communication with the actor fails.
    pub async fn count(&self) -> usize {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::Count { respond_to: tx })
            .await
            .is_err()
        {
            return 0;
        }

        rx.await.unwrap_or(0)
    }

    /// Check if the registry actor is still running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_handle() -> (RegistryHandle, mpsc::Receiver<RegistryCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        (RegistryHandle::new(cmd_tx), cmd_rx)
    }

    fn addr() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    #[tokio::test]
    async fn test_handle_is_clone() {
        let (handle, _rx) = create_test_handle();
        let _cloned = handle.clone();
    }

    #[tokio::test]
    async fn test_register_sends_command() {
        let (handle, mut rx) = create_test_handle();

        let cmd_handler = tokio::spawn(async move {
            if let Some(RegistryCommand::Register {
                remote_addr,
                respond_to,
                ..
            }) = rx.recv().await
            {
                let _ = respond_to.send(Ok(ClientInfo::new(ClientId::new(10), remote_addr)));
            }
        });

        let (outbox, _out_rx) = Outbox::channel(1);
        let info = handle.register(addr(), outbox).await.unwrap();
        assert_eq!(info.id, ClientId::new(10));
        assert_eq!(info.remote_addr, addr());

        cmd_handler.await.unwrap();
    }

    #[tokio::test]
    async fn test_rename_sends_command() {
        let (handle, mut rx) = create_test_handle();

        let cmd_handler = tokio::spawn(async move {
            if let Some(RegistryCommand::Rename {
                client_id,
                name,
                respond_to,
            }) = rx.recv().await
            {
                assert_eq!(client_id, ClientId::new(10));
                assert_eq!(name.as_str(), "Alice");
                let _ = respond_to.send(Ok(DisplayName::from_id(client_id)));
            }
        });

        let old = handle
            .rename(ClientId::new(10), DisplayName::new("Alice"))
            .await
            .unwrap();
        assert_eq!(old.as_str(), "10");

        cmd_handler.await.unwrap();
    }

    #[tokio::test]
    async fn test_channel_closed_error() {
        let (handle, rx) = create_test_handle();
        drop(rx);

        let (outbox, _out_rx) = Outbox::channel(1);
        assert_eq!(
            handle.register(addr(), outbox).await,
            Err(RegistryError::ChannelClosed)
        );
        assert_eq!(
            handle
                .rename(ClientId::new(10), DisplayName::new("x"))
                .await,
            Err(RegistryError::ChannelClosed)
        );
        assert!(!handle.is_connected());
    }

    #[tokio::test]
    async fn test_queries_degrade_when_actor_gone() {
        let (handle, rx) = create_test_handle();
        drop(rx);

        assert!(handle.lookup(ClientId::new(10)).await.is_none());
        assert!(handle.snapshot().await.is_empty());
        assert_eq!(handle.count().await, 0);
        assert!(!handle.remove(ClientId::new(10)).await);
    }
}
