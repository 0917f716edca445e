//! Registry actor - owns the set of active clients and processes commands.
//!
//! The RegistryActor is the single owner of client state in the relay.
//! Every mutation and every read goes through its command channel, so
//! concurrent sessions observe one linear history of joins, renames and
//! leaves.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Response send failures are ignored (the requester went away)

use std::collections::BTreeMap;
use std::net::SocketAddr;

use relay_core::limits::{DEFAULT_ID_BASE, DEFAULT_MAX_CLIENTS};
use relay_core::{ClientId, ClientInfo, DisplayName};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::commands::{ClientRef, RegistryCommand, RegistryError};
use crate::outbox::Outbox;

// ============================================================================
// Registry Configuration
// ============================================================================

/// Limits applied by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum number of simultaneously registered clients
    pub max_clients: usize,

    /// First id handed out
    pub id_base: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_clients: DEFAULT_MAX_CLIENTS,
            id_base: DEFAULT_ID_BASE,
        }
    }
}

// ============================================================================
// Registry Actor
// ============================================================================

/// The registry actor - owns all client entries.
///
/// # Ownership
///
/// The actor owns:
/// - `clients`: entries keyed by id, iterated in ascending id order
/// - `next_id`: the next id to hand out, `None` once the counter has run out
///
/// Ids are never reused within one actor lifetime, and a rejected
/// registration does not consume one.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Active clients keyed by id
    clients: BTreeMap<ClientId, ClientRef>,

    /// Next id to assign
    next_id: Option<u32>,

    /// Capacity limit
    max_clients: usize,
}

impl RegistryActor {
    /// Creates a new registry actor.
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>, config: RegistryConfig) -> Self {
        Self {
            receiver,
            clients: BTreeMap::new(),
            next_id: Some(config.id_base),
            max_clients: config.max_clients,
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all handles dropped).
    pub async fn run(mut self) {
        info!(max_clients = self.max_clients, "Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("Registry actor stopped (clients: {})", self.clients.len());
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Register {
                remote_addr,
                outbox,
                respond_to,
            } => {
                let result = self.handle_register(remote_addr, outbox);
                // Ignore send error - the session may have gone away
                let _ = respond_to.send(result);
            }
            RegistryCommand::Remove {
                client_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.handle_remove(client_id));
            }
            RegistryCommand::Rename {
                client_id,
                name,
                respond_to,
            } => {
                let _ = respond_to.send(self.handle_rename(client_id, name));
            }
            RegistryCommand::Lookup {
                client_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.clients.get(&client_id).cloned());
            }
            RegistryCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.clients.values().cloned().collect());
            }
            RegistryCommand::Count { respond_to } => {
                let _ = respond_to.send(self.clients.len());
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    fn handle_register(
        &mut self,
        remote_addr: SocketAddr,
        outbox: Outbox,
    ) -> Result<ClientInfo, RegistryError> {
        if self.clients.len() >= self.max_clients {
            warn!(
                %remote_addr,
                current = self.clients.len(),
                max = self.max_clients,
                "Registry is full, rejecting registration"
            );
            return Err(RegistryError::RegistryFull {
                max: self.max_clients,
            });
        }

        let Some(raw_id) = self.next_id else {
            warn!(%remote_addr, "Client id space exhausted, rejecting registration");
            return Err(RegistryError::IdsExhausted);
        };
        self.next_id = raw_id.checked_add(1);

        let info = ClientInfo::new(ClientId::new(raw_id), remote_addr);
        self.clients.insert(
            info.id,
            ClientRef {
                info: info.clone(),
                outbox,
            },
        );

        debug!(
            client_id = %info.id,
            %remote_addr,
            total = self.clients.len(),
            "Client registered"
        );
        Ok(info)
    }

    fn handle_remove(&mut self, client_id: ClientId) -> bool {
        match self.clients.remove(&client_id) {
            Some(entry) => {
                debug!(
                    client_id = %client_id,
                    name = %entry.info.name,
                    remaining = self.clients.len(),
                    "Client removed"
                );
                true
            }
            None => {
                debug!(client_id = %client_id, "Remove for unknown client ignored");
                false
            }
        }
    }

    fn handle_rename(
        &mut self,
        client_id: ClientId,
        name: DisplayName,
    ) -> Result<DisplayName, RegistryError> {
        let entry = self
            .clients
            .get_mut(&client_id)
            .ok_or(RegistryError::ClientNotFound(client_id))?;

        let old = std::mem::replace(&mut entry.info.name, name);
        debug!(
            client_id = %client_id,
            old = %old,
            new = %entry.info.name,
            "Client renamed"
        );
        Ok(old)
    }

    // ========================================================================
    // Query Methods (for testing)
    // ========================================================================

    /// Returns the number of registered clients.
    #[cfg(test)]
    pub(crate) fn client_count(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn addr() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    fn create_actor(config: RegistryConfig) -> RegistryActor {
        let (_tx, rx) = mpsc::channel(16);
        RegistryActor::new(rx, config)
    }

    fn register(actor: &mut RegistryActor) -> Result<ClientInfo, RegistryError> {
        let (outbox, _rx) = Outbox::channel(4);
        actor.handle_register(addr(), outbox)
    }

    #[test]
    fn test_register_assigns_ids_from_base() {
        let mut actor = create_actor(RegistryConfig::default());

        let first = register(&mut actor).unwrap();
        let second = register(&mut actor).unwrap();

        assert_eq!(first.id, ClientId::new(10));
        assert_eq!(first.name.as_str(), "10");
        assert_eq!(second.id, ClientId::new(11));
        assert_eq!(actor.client_count(), 2);
    }

    #[test]
    fn test_ids_are_not_reused_after_remove() {
        let mut actor = create_actor(RegistryConfig::default());

        let first = register(&mut actor).unwrap();
        assert!(actor.handle_remove(first.id));

        let second = register(&mut actor).unwrap();
        assert_eq!(second.id, ClientId::new(11));
    }

    #[test]
    fn test_register_full_rejects_without_consuming_id() {
        let mut actor = create_actor(RegistryConfig {
            max_clients: 1,
            id_base: 10,
        });

        let first = register(&mut actor).unwrap();
        assert_eq!(
            register(&mut actor),
            Err(RegistryError::RegistryFull { max: 1 })
        );

        actor.handle_remove(first.id);
        let next = register(&mut actor).unwrap();
        assert_eq!(next.id, ClientId::new(11));
    }

    #[test]
    fn test_exhausted_id_counter() {
        let mut actor = create_actor(RegistryConfig {
            max_clients: 10,
            id_base: u32::MAX,
        });

        let last = register(&mut actor).unwrap();
        assert_eq!(last.id, ClientId::new(u32::MAX));
        assert_eq!(register(&mut actor), Err(RegistryError::IdsExhausted));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut actor = create_actor(RegistryConfig::default());
        let info = register(&mut actor).unwrap();

        assert!(actor.handle_remove(info.id));
        assert!(!actor.handle_remove(info.id));
        assert!(!actor.handle_remove(ClientId::new(999)));
        assert_eq!(actor.client_count(), 0);
    }

    #[test]
    fn test_rename_returns_previous_name() {
        let mut actor = create_actor(RegistryConfig::default());
        let info = register(&mut actor).unwrap();

        let old = actor
            .handle_rename(info.id, DisplayName::new("Alice"))
            .unwrap();
        assert_eq!(old.as_str(), "10");

        let old = actor.handle_rename(info.id, DisplayName::new("Bob")).unwrap();
        assert_eq!(old.as_str(), "Alice");
        assert_eq!(
            actor.clients.get(&info.id).map(|c| c.info.name.as_str()),
            Some("Bob")
        );
    }

    #[test]
    fn test_rename_unknown_client() {
        let mut actor = create_actor(RegistryConfig::default());
        assert_eq!(
            actor.handle_rename(ClientId::new(42), DisplayName::new("x")),
            Err(RegistryError::ClientNotFound(ClientId::new(42)))
        );
    }

    #[tokio::test]
    async fn test_snapshot_is_ordered_by_id() {
        let mut actor = create_actor(RegistryConfig::default());
        for _ in 0..3 {
            register(&mut actor).unwrap();
        }
        actor.handle_remove(ClientId::new(11));

        let (tx, rx) = oneshot::channel();
        actor.handle_command(RegistryCommand::Snapshot { respond_to: tx });
        let ids: Vec<u32> = rx.await.unwrap().iter().map(|c| c.id().get()).collect();
        assert_eq!(ids, vec![10, 12]);
    }

    #[tokio::test]
    async fn test_lookup_through_command() {
        let mut actor = create_actor(RegistryConfig::default());
        let info = register(&mut actor).unwrap();

        let (tx, rx) = oneshot::channel();
        actor.handle_command(RegistryCommand::Lookup {
            client_id: info.id,
            respond_to: tx,
        });
        let found = rx.await.unwrap().unwrap();
        assert_eq!(found.info.id, info.id);

        let (tx, rx) = oneshot::channel();
        actor.handle_command(RegistryCommand::Lookup {
            client_id: ClientId::new(99),
            respond_to: tx,
        });
        assert!(rx.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dropped_responder_does_not_panic() {
        let mut actor = create_actor(RegistryConfig::default());
        let (tx, rx) = oneshot::channel();
        drop(rx);
        actor.handle_command(RegistryCommand::Count { respond_to: tx });
    }
}
