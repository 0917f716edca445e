//! TCP server for the chat relay.
//!
//! The server:
//! - Listens on a TCP socket for chat clients
//! - Spawns a [`Session`] task for each accepted connection
//! - Stops accepting when its `CancellationToken` is triggered
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   ChatServer    │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │     Session     │────▶│  RegistryHandle │
//! │   (per client)  │     │                 │
//! └─────────────────┘     └─────────────────┘
//! ```
//!
//! Running sessions are not cancelled with the accept loop: each one ends
//! only when its own client quits or disconnects.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Accept errors are logged and the loop keeps going

mod connection;
mod session;

pub use connection::{ConnectionEvent, ConnectionHandle, ConnectionSettings};
pub use session::{CloseReason, Session};

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::registry::RegistryHandle;

/// Errors starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// TCP accept loop handing each connection to its own session.
pub struct ChatServer {
    listener: TcpListener,
    registry: RegistryHandle,
    settings: ConnectionSettings,
    cancel_token: CancellationToken,
}

impl ChatServer {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if the address cannot be bound.
    pub async fn bind(
        config: &RelayConfig,
        registry: RegistryHandle,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.listen)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.listen,
                source,
            })?;

        Ok(Self {
            listener,
            registry,
            settings: config.connection_settings(),
            cancel_token,
        })
    }

    /// Returns the bound address (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::LocalAddr)
    }

    /// Accepts connections until the cancellation token is triggered.
    pub async fn run(self) {
        match self.listener.local_addr() {
            Ok(addr) => info!(addr = %addr, "Chat server listening"),
            Err(e) => debug!(error = %e, "Chat server listening on unknown address"),
        }

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => self.handle_connection(stream, peer),
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            // Continue accepting other connections
                        }
                    }
                }
            }
        }
    }

    /// Spawns a session task for an accepted connection.
    fn handle_connection(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        debug!(peer = %peer, "Accepted connection");
        let session = Session::new(stream, peer, self.registry.clone(), self.settings);

        tokio::spawn(async move {
            let state = session.run().await;
            if state.is_terminal() {
                debug!(peer = %peer, "Session finished");
            } else {
                warn!(peer = %peer, state = %state, "Session ended without closing");
            }
        });
    }
}
