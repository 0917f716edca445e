//! Outbound messages and their routing policies.

use relay_core::limits::{MAX_CHAT_PAYLOAD, MAX_NOTICE_PAYLOAD};
use relay_core::{truncate_utf8, ClientId};

/// Recipient-selection rule attached to an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Every active client
    Broadcast,

    /// Every active client except the given one
    BroadcastExceptSender(ClientId),

    /// A single client, if it is active
    ToClient(ClientId),

    /// The originating connection, bypassing the registry
    ToSelf,
}

/// Kind of payload, which decides the payload bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Client-authored text: chat and private messages
    Chat,

    /// Server-authored text: join, leave, rename, replies
    Notice,
}

impl MessageKind {
    /// Maximum payload size in bytes, excluding the line terminator.
    pub fn max_payload(self) -> usize {
        match self {
            Self::Chat => MAX_CHAT_PAYLOAD,
            Self::Notice => MAX_NOTICE_PAYLOAD,
        }
    }
}

/// A single line to deliver, plus who should receive it.
///
/// The body never contains a line terminator; the codec appends CRLF
/// when the line is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    body: String,
    kind: MessageKind,
    routing: Routing,
}

impl OutboundMessage {
    /// Creates a message, cutting the body to the kind's payload bound.
    pub fn new(kind: MessageKind, body: impl AsRef<str>, routing: Routing) -> Self {
        Self {
            body: truncate_utf8(body.as_ref(), kind.max_payload()).to_string(),
            kind,
            routing,
        }
    }

    /// Creates a client-authored message.
    pub fn chat(body: impl AsRef<str>, routing: Routing) -> Self {
        Self::new(MessageKind::Chat, body, routing)
    }

    /// Creates a server-authored notice.
    pub fn notice(body: impl AsRef<str>, routing: Routing) -> Self {
        Self::new(MessageKind::Notice, body, routing)
    }

    /// Returns the line body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the payload kind.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Returns the routing policy.
    pub fn routing(&self) -> Routing {
        self.routing
    }
}
