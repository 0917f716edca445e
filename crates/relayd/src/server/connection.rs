//! Connection handle for a single client socket.
//!
//! The handle splits the socket in two:
//! - the read half is framed with [`ChatLineCodec`] and polled by the session
//! - the write half is owned by a writer task draining the client's [`Outbox`]
//!
//! Every socket write is bounded by the write timeout, so a peer that stops
//! reading only stalls its own writer task.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Writer failures are returned through the join handle, never raised
//! - A writer that does not finish within the close timeout is aborted

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use relay_protocol::{ChatLineCodec, CodecError};
use tokio::io::AsyncWrite;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::outbox::{DeliveryError, Outbox};

/// Per-connection limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Outbound queue depth
    pub outbox_capacity: usize,

    /// Bound on a single socket write
    pub write_timeout: Duration,

    /// Bound on flushing queued lines at close
    pub close_timeout: Duration,
}

/// What happened on the connection since the last poll.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// One raw inbound line, terminator included if present
    Line(String),

    /// The peer closed its side
    EndOfStream,

    /// Reading from the socket failed
    ReadError(CodecError),

    /// The writer task stopped on its own
    WriterStopped(Result<(), DeliveryError>),
}

/// Exclusive owner of one client socket.
///
/// Consumed by [`ConnectionHandle::close`], so the socket is released
/// exactly once. Dropping the handle without closing it still stops the
/// writer.
pub struct ConnectionHandle {
    peer: SocketAddr,
    reader: FramedRead<OwnedReadHalf, ChatLineCodec>,
    writer: Option<JoinHandle<Result<(), DeliveryError>>>,
    shutdown: CancellationToken,
}

impl ConnectionHandle {
    /// Takes ownership of `stream` and starts its writer task.
    ///
    /// Returns the handle and the outbox feeding the writer.
    pub fn open(stream: TcpStream, peer: SocketAddr, settings: ConnectionSettings) -> (Self, Outbox) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
        }

        let (read_half, write_half) = stream.into_split();
        let (outbox, queue) = Outbox::channel(settings.outbox_capacity);
        let shutdown = CancellationToken::new();

        let writer = tokio::spawn(write_loop(
            write_half,
            queue,
            settings.write_timeout,
            shutdown.clone(),
        ));

        let handle = Self {
            peer,
            reader: FramedRead::new(read_half, ChatLineCodec::new()),
            writer: Some(writer),
            shutdown,
        };
        (handle, outbox)
    }

    /// Returns the peer address captured at accept time.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Waits for the next inbound line or for the connection to end.
    pub async fn next_event(&mut self) -> ConnectionEvent {
        enum Step {
            Frame(Option<Result<String, CodecError>>),
            Writer(Result<Result<(), DeliveryError>, tokio::task::JoinError>),
        }

        let step = match self.writer.as_mut() {
            Some(writer) => tokio::select! {
                frame = self.reader.next() => Step::Frame(frame),
                joined = writer => Step::Writer(joined),
            },
            None => Step::Frame(self.reader.next().await),
        };

        match step {
            Step::Frame(Some(Ok(line))) => ConnectionEvent::Line(line),
            Step::Frame(Some(Err(e))) => ConnectionEvent::ReadError(e),
            Step::Frame(None) => ConnectionEvent::EndOfStream,
            Step::Writer(joined) => {
                // The task is finished; never poll its handle again
                self.writer = None;
                ConnectionEvent::WriterStopped(flatten_join(joined))
            }
        }
    }

    /// Flushes queued lines and releases the socket.
    ///
    /// The writer gets `close_timeout` to drain what is already queued;
    /// lines enqueued after this call are refused.
    pub async fn close(mut self, close_timeout: Duration) {
        self.shutdown.cancel();

        let Some(mut writer) = self.writer.take() else {
            return;
        };

        match timeout(close_timeout, &mut writer).await {
            Ok(joined) => {
                if let Err(e) = flatten_join(joined) {
                    debug!(peer = %self.peer, error = %e, "Writer ended with error");
                }
            }
            Err(_) => {
                warn!(peer = %self.peer, "Writer did not drain in time, aborting");
                writer.abort();
            }
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn flatten_join(
    joined: Result<Result<(), DeliveryError>, tokio::task::JoinError>,
) -> Result<(), DeliveryError> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(DeliveryError::Io(format!("writer task failed: {e}"))),
    }
}

/// Drains `queue` into `writer` until shutdown, then flushes what is left.
async fn write_loop<W>(
    writer: W,
    mut queue: mpsc::Receiver<String>,
    write_timeout: Duration,
    shutdown: CancellationToken,
) -> Result<(), DeliveryError>
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, ChatLineCodec::new());

    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            line = queue.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };
        send_line(&mut sink, line, write_timeout).await?;
    }

    queue.close();
    while let Some(line) = queue.recv().await {
        send_line(&mut sink, line, write_timeout).await?;
    }

    match timeout(write_timeout, sink.close()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(DeliveryError::Io(e.to_string())),
        Err(_) => Err(DeliveryError::WriteTimeout),
    }
}

async fn send_line<W>(
    sink: &mut FramedWrite<W, ChatLineCodec>,
    line: String,
    write_timeout: Duration,
) -> Result<(), DeliveryError>
where
    W: AsyncWrite + Unpin,
{
    match timeout(write_timeout, sink.send(line)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(DeliveryError::Io(e.to_string())),
        Err(_) => Err(DeliveryError::WriteTimeout),
    }
}
