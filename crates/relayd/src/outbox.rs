//! Per-client outbound queue.
//!
//! Every session owns a bounded queue drained by its own writer task.
//! Delivery to other clients only enqueues, so a client that stops reading
//! fills its own queue and loses messages instead of stalling the sender.
//! A session writing to its own queue waits for room instead; its writer
//! gives up after the write timeout, which ends the wait.

use thiserror::Error;
use tokio::sync::mpsc;

/// Errors for a single delivery attempt to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The recipient's queue is full (slow or stalled reader).
    #[error("outbound queue full")]
    QueueFull,

    /// The recipient's writer has stopped.
    #[error("recipient disconnected")]
    Disconnected,

    /// Writing to the socket did not finish in time.
    #[error("write timed out")]
    WriteTimeout,

    /// Writing to the socket failed.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Sending side of a client's outbound queue.
///
/// Cheap to clone; the registry keeps one clone per active client.
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: mpsc::Sender<String>,
}

impl Outbox {
    /// Creates an outbox and the receiver its writer drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Enqueues one line without waiting.
    ///
    /// # Errors
    ///
    /// - `DeliveryError::QueueFull` if the writer is behind
    /// - `DeliveryError::Disconnected` if the writer is gone
    pub fn try_deliver(&self, line: &str) -> Result<(), DeliveryError> {
        self.sender
            .try_send(line.to_string())
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => DeliveryError::Disconnected,
            })
    }

    /// Enqueues one line, waiting for room in the queue.
    ///
    /// Only for the queue's own session: the wait is bounded by that
    /// session's writer, which drops the queue once a write times out.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Disconnected` if the writer is gone.
    pub async fn deliver(&self, line: &str) -> Result<(), DeliveryError> {
        self.sender
            .send(line.to_string())
            .await
            .map_err(|_| DeliveryError::Disconnected)
    }
}
