//! Recipient resolution and per-recipient delivery.
//!
//! The broadcaster turns an [`OutboundMessage`] into enqueue attempts on
//! recipient outboxes. Recipients are resolved from a single registry
//! snapshot (or lookup), and every attempt is independent: a full or
//! closed outbox is recorded in the report and delivery moves on.
//!
//! Enqueueing on other clients' outboxes never blocks, so a stalled peer
//! only ever loses its own messages. Lines for the originating connection
//! wait for room, so multi-line replies such as a client listing arrive
//! whole.

use relay_core::ClientId;
use relay_protocol::{OutboundMessage, Routing};
use tracing::{debug, warn};

use crate::outbox::{DeliveryError, Outbox};
use crate::registry::{ClientRef, RegistryHandle};

/// Outcome of delivering one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Recipients resolved for the message
    pub attempted: usize,

    /// Recipients whose outbox accepted the line
    pub delivered: usize,

    /// Failed recipients; `None` stands for the originating connection
    pub failures: Vec<(Option<ClientId>, DeliveryError)>,
}

impl DeliveryReport {
    fn record(&mut self, recipient: Option<ClientId>, result: Result<(), DeliveryError>) {
        self.attempted += 1;
        match result {
            Ok(()) => self.delivered += 1,
            Err(e) => self.failures.push((recipient, e)),
        }
    }
}

/// Delivers outbound messages according to their routing policy.
#[derive(Clone)]
pub struct Broadcaster {
    registry: RegistryHandle,
}

impl Broadcaster {
    pub fn new(registry: RegistryHandle) -> Self {
        Self { registry }
    }

    /// Delivers `message` and reports per-recipient results.
    ///
    /// `origin` is the sending connection's own outbox, used for
    /// [`Routing::ToSelf`]. It does not need to be registered, which is
    /// how a rejected connection still gets its rejection notice. Those
    /// lines wait for room in the origin's queue rather than being dropped.
    pub async fn deliver(&self, origin: &Outbox, message: &OutboundMessage) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let body = message.body();

        match message.routing() {
            Routing::ToSelf => {
                report.record(None, origin.deliver(body).await);
            }
            Routing::ToClient(target) => match self.registry.lookup(target).await {
                Some(client) => {
                    report.record(Some(client.id()), client.outbox.try_deliver(body));
                }
                None => {
                    debug!(target_id = %target, "No active client for targeted delivery");
                }
            },
            Routing::Broadcast => {
                let recipients = self.registry.snapshot().await;
                deliver_all(&mut report, recipients.iter(), body);
            }
            Routing::BroadcastExceptSender(sender) => {
                let recipients = self.registry.snapshot().await;
                deliver_all(
                    &mut report,
                    recipients.iter().filter(|c| c.id() != sender),
                    body,
                );
            }
        }

        for (recipient, error) in &report.failures {
            let recipient = recipient.map_or_else(|| "self".to_string(), |id| id.to_string());
            match error {
                DeliveryError::QueueFull => {
                    warn!(recipient = %recipient, "Dropping message for slow client");
                }
                other => {
                    debug!(recipient = %recipient, error = %other, "Delivery failed");
                }
            }
        }

        report
    }
}

fn deliver_all<'a>(
    report: &mut DeliveryReport,
    recipients: impl Iterator<Item = &'a ClientRef>,
    body: &str,
) {
    for client in recipients {
        report.record(Some(client.id()), client.outbox.try_deliver(body));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{spawn_registry, RegistryConfig};
    use std::net::SocketAddr;
    use tokio::sync::mpsc;

    fn addr() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    async fn join(
        registry: &RegistryHandle,
        capacity: usize,
    ) -> (ClientId, mpsc::Receiver<String>) {
        let (outbox, rx) = Outbox::channel(capacity);
        let info = registry.register(addr(), outbox).await.unwrap();
        (info.id, rx)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let registry = spawn_registry(RegistryConfig::default());
        let (_a, mut rx_a) = join(&registry, 4).await;
        let (_b, mut rx_b) = join(&registry, 4).await;
        let (origin, _rx) = Outbox::channel(1);

        let report = Broadcaster::new(registry)
            .deliver(&origin, &OutboundMessage::notice("<<PING", Routing::Broadcast))
            .await;

        assert_eq!(report.attempted, 2);
        assert!(report.failures.is_empty());
        assert_eq!(rx_a.try_recv().unwrap(), "<<PING");
        assert_eq!(rx_b.try_recv().unwrap(), "<<PING");
    }

    #[tokio::test]
    async fn test_broadcast_except_sender_skips_sender() {
        let registry = spawn_registry(RegistryConfig::default());
        let (a, mut rx_a) = join(&registry, 4).await;
        let (_b, mut rx_b) = join(&registry, 4).await;
        let (origin, _rx) = Outbox::channel(1);

        let msg = OutboundMessage::chat("[10] hi", Routing::BroadcastExceptSender(a));
        let report = Broadcaster::new(registry).deliver(&origin, &msg).await;

        assert_eq!(report.attempted, 1);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), "[10] hi");
    }

    #[tokio::test]
    async fn test_to_client_targets_one() {
        let registry = spawn_registry(RegistryConfig::default());
        let (_a, mut rx_a) = join(&registry, 4).await;
        let (b, mut rx_b) = join(&registry, 4).await;
        let (origin, _rx) = Outbox::channel(1);

        let msg = OutboundMessage::chat("[PM][10] secret", Routing::ToClient(b));
        Broadcaster::new(registry).deliver(&origin, &msg).await;

        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), "[PM][10] secret");
    }

    #[tokio::test]
    async fn test_to_absent_client_is_noop() {
        let registry = spawn_registry(RegistryConfig::default());
        let (origin, mut rx) = Outbox::channel(1);

        let msg = OutboundMessage::chat("x", Routing::ToClient(ClientId::new(77)));
        let report = Broadcaster::new(registry).deliver(&origin, &msg).await;

        assert_eq!(report, DeliveryReport::default());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_to_self_bypasses_registry() {
        let registry = spawn_registry(RegistryConfig::default());
        let (origin, mut rx) = Outbox::channel(1);

        let report = Broadcaster::new(registry)
            .deliver(&origin, &OutboundMessage::notice("<<PONG", Routing::ToSelf))
            .await;

        assert_eq!(report.delivered, 1);
        assert_eq!(rx.try_recv().unwrap(), "<<PONG");
    }

    #[tokio::test]
    async fn test_to_self_waits_instead_of_dropping() {
        let registry = spawn_registry(RegistryConfig::default());
        let (origin, mut rx) = Outbox::channel(2);
        let broadcaster = Broadcaster::new(registry);

        let reader = tokio::spawn(async move {
            let mut lines = Vec::new();
            while let Some(line) = rx.recv().await {
                lines.push(line);
            }
            lines
        });

        for i in 0..20 {
            let report = broadcaster
                .deliver(
                    &origin,
                    &OutboundMessage::notice(format!("<<CLIENT {i}"), Routing::ToSelf),
                )
                .await;
            assert_eq!(report.delivered, 1);
        }
        drop(origin);

        let lines = reader.await.unwrap();
        assert_eq!(lines.len(), 20);
        assert_eq!(lines[19], "<<CLIENT 19");
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_recipient() {
        let registry = spawn_registry(RegistryConfig::default());
        let (full, _rx_full) = join(&registry, 1).await;
        let (gone, rx_gone) = join(&registry, 4).await;
        let (_ok, mut rx_ok) = join(&registry, 4).await;
        drop(rx_gone);

        let broadcaster = Broadcaster::new(registry);
        let (origin, _rx) = Outbox::channel(1);
        broadcaster
            .deliver(&origin, &OutboundMessage::notice("first", Routing::Broadcast))
            .await;
        let report = broadcaster
            .deliver(&origin, &OutboundMessage::notice("second", Routing::Broadcast))
            .await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 1);
        assert!(report
            .failures
            .contains(&(Some(full), DeliveryError::QueueFull)));
        assert!(report
            .failures
            .contains(&(Some(gone), DeliveryError::Disconnected)));
        assert_eq!(rx_ok.try_recv().unwrap(), "first");
        assert_eq!(rx_ok.try_recv().unwrap(), "second");
    }
}
