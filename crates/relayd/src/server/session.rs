//! Per-client session state machine.
//!
//! ```text
//! Connecting ──register ok──▶ Active ──quit / eof / error──▶ Closing ──▶ Closed
//!      │                       ▲  │
//!      │                       └──┘ every dispatched command
//!      └──registration refused─────────────────────────────────▶ Closed
//! ```
//!
//! A session owns its [`ConnectionHandle`]. Entering `Active` broadcasts a
//! join notice to everyone else; entering `Closing` removes the client from
//! the registry and broadcasts a leave notice to whoever remains. Neither
//! notice can fail the session.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Transport errors become a transition to `Closing`, never an error
//!   returned to the accept loop

use std::net::SocketAddr;
use std::time::Duration;

use relay_core::{ClientId, ClientInfo, DisplayName, SessionState};
use relay_protocol::{
    notice, parse_command, strip_line_ending, Command, OutboundMessage, Routing,
};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use super::connection::{ConnectionEvent, ConnectionHandle, ConnectionSettings};
use crate::broadcaster::Broadcaster;
use crate::outbox::Outbox;
use crate::registry::{RegistryError, RegistryHandle};

/// Why an active session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client sent `\QUIT`
    Quit,

    /// The peer closed the stream
    EndOfStream,

    /// Reading from the socket failed
    ReadError,

    /// The client's own writer stopped (timeout or socket error)
    WriteFailed,
}

/// One client's lifecycle, from accept to close.
pub struct Session {
    connection: ConnectionHandle,
    outbox: Outbox,
    registry: RegistryHandle,
    broadcaster: Broadcaster,
    close_timeout: Duration,
    state: SessionState,

    /// Display name as last set through the registry
    name: DisplayName,
}

impl Session {
    /// Takes ownership of an accepted stream. The session starts in
    /// `Connecting`; nothing is registered until [`Session::run`].
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        registry: RegistryHandle,
        settings: ConnectionSettings,
    ) -> Self {
        let (connection, outbox) = ConnectionHandle::open(stream, peer, settings);
        Self {
            connection,
            outbox,
            broadcaster: Broadcaster::new(registry.clone()),
            registry,
            close_timeout: settings.close_timeout,
            state: SessionState::Connecting,
            name: DisplayName::new(""),
        }
    }

    /// Drives the session to completion and returns its final state.
    pub async fn run(mut self) -> SessionState {
        let peer = self.connection.peer();

        let info = match self.registry.register(peer, self.outbox.clone()).await {
            Ok(info) => info,
            Err(e) => return self.reject(e).await,
        };

        self.advance(SessionState::Active);
        self.name = info.name.clone();
        info!(client_id = %info.id, peer = %peer, "Client joined");

        self.notify(notice::join(&self.name), Routing::BroadcastExceptSender(info.id))
            .await;

        let reason = self.read_loop(info.id).await;
        self.finish(&info, reason).await
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    async fn reject(self, error: RegistryError) -> SessionState {
        warn!(
            peer = %self.connection.peer(),
            error = %error,
            "Rejecting connection"
        );
        if matches!(error, RegistryError::RegistryFull { .. }) {
            self.notify(notice::MAX_CLIENTS_REACHED, Routing::ToSelf).await;
        }
        self.release().await
    }

    async fn finish(mut self, info: &ClientInfo, reason: CloseReason) -> SessionState {
        self.advance(SessionState::Closing);

        if !self.registry.remove(info.id).await {
            debug!(client_id = %info.id, "Client was already gone from the registry");
        }
        self.notify(notice::leave(&self.name), Routing::Broadcast).await;

        info!(
            client_id = %info.id,
            name = %self.name,
            peer = %info.remote_addr,
            reason = ?reason,
            duration_secs = info.connected_secs(),
            "Client left"
        );
        self.release().await
    }

    /// Closes the connection and moves to `Closed`.
    async fn release(self) -> SessionState {
        let Self {
            connection,
            close_timeout,
            state,
            ..
        } = self;

        connection.close(close_timeout).await;
        state.transition(SessionState::Closed).unwrap_or_else(|e| {
            warn!(error = %e, "Forcing session closed");
            SessionState::Closed
        })
    }

    fn advance(&mut self, next: SessionState) {
        match self.state.transition(next) {
            Ok(state) => self.state = state,
            Err(e) => warn!(error = %e, "Ignoring session transition"),
        }
    }

    // ========================================================================
    // Command Loop
    // ========================================================================

    async fn read_loop(&mut self, id: ClientId) -> CloseReason {
        loop {
            match self.connection.next_event().await {
                ConnectionEvent::Line(raw) => {
                    let line = strip_line_ending(&raw);
                    if line.is_empty() {
                        continue;
                    }

                    match parse_command(line) {
                        Ok(command) => {
                            if let Some(reason) = self.dispatch(id, command).await {
                                return reason;
                            }
                            self.advance(SessionState::Active);
                        }
                        Err(e) => {
                            debug!(client_id = %id, error = %e, "Command usage error");
                            self.notify(notice::usage_error(e), Routing::ToSelf).await;
                        }
                    }
                }
                ConnectionEvent::EndOfStream => return CloseReason::EndOfStream,
                ConnectionEvent::ReadError(e) => {
                    debug!(client_id = %id, error = %e, "Read failed");
                    return CloseReason::ReadError;
                }
                ConnectionEvent::WriterStopped(result) => {
                    debug!(client_id = %id, result = ?result, "Writer stopped");
                    return CloseReason::WriteFailed;
                }
            }
        }
    }

    /// Applies one command. Returns a close reason when the session should end.
    async fn dispatch(&mut self, id: ClientId, command: Command) -> Option<CloseReason> {
        match command {
            Command::Quit => return Some(CloseReason::Quit),
            Command::Ping => {
                self.notify(notice::PONG, Routing::ToSelf).await;
            }
            Command::Rename(requested) => {
                let new_name = DisplayName::new(requested);
                match self.registry.rename(id, new_name.clone()).await {
                    Ok(old) => {
                        self.name = new_name;
                        self.notify(notice::rename(&old, &self.name), Routing::Broadcast)
                            .await;
                    }
                    Err(e) => warn!(client_id = %id, error = %e, "Rename failed"),
                }
            }
            Command::PrivateMessage { target, body } => match target {
                Some(target) => {
                    let report = self
                        .broadcaster
                        .deliver(
                            &self.outbox,
                            &OutboundMessage::chat(
                                notice::private(&self.name, &body),
                                Routing::ToClient(target),
                            ),
                        )
                        .await;
                    if report.attempted == 0 {
                        debug!(client_id = %id, target_id = %target, "Private message target not active");
                    }
                }
                None => {
                    debug!(client_id = %id, "Private message reference is not an id");
                }
            },
            Command::ListActive => {
                let clients = self.registry.snapshot().await;
                self.notify(notice::active_header(clients.len()), Routing::ToSelf)
                    .await;
                for client in &clients {
                    self.notify(
                        notice::active_entry(client.info.id, &client.info.name),
                        Routing::ToSelf,
                    )
                    .await;
                }
            }
            Command::Help => {
                for line in notice::HELP_LINES {
                    self.notify(line, Routing::ToSelf).await;
                }
            }
            Command::Unknown(verb) => {
                debug!(client_id = %id, verb = %verb, "Unknown command");
                self.notify(notice::UNKNOWN_COMMAND, Routing::ToSelf).await;
            }
            Command::PlainChat(text) => {
                self.broadcaster
                    .deliver(
                        &self.outbox,
                        &OutboundMessage::chat(
                            notice::chat(&self.name, &text),
                            Routing::BroadcastExceptSender(id),
                        ),
                    )
                    .await;
            }
        }
        None
    }

    async fn notify(&self, body: impl AsRef<str>, routing: Routing) {
        self.broadcaster
            .deliver(&self.outbox, &OutboundMessage::notice(body, routing))
            .await;
    }
}
