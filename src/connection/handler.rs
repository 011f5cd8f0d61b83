//! Connection Handler Module
//!
//! This module handles individual client connections to tsmetrics.
//! Each client gets its own handler task that runs in a loop,
//! reading frames and sending responses.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read bytes from socket  │ │   Reading
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Split frame, execute    │ │   Processing
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Send response           │ │   Writing
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Empty read (peer closed) or I/O error
//!        │
//!        ▼
//! 5. Handler task ends                 Closed
//! ```
//!
//! ## Buffer Management
//!
//! Incoming bytes accumulate in a `BytesMut` buffer. A frame that arrives in
//! pieces is reassembled, and several frames arriving in one read are handled
//! one after another in the order received.

use crate::commands::CommandHandler;
use crate::protocol::{next_frame, Response, SEP};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

/// Maximum size of a single frame (64 KB)
const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Minimum free space guaranteed before each socket read
const READ_CHUNK_SIZE: usize = 2048;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed, malformed ones included
    pub commands_processed: AtomicU64,
    /// Commands answered with `error`
    pub protocol_errors: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self, response: &Response) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
        if response.is_error() {
            self.protocol_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Generic over the stream so the loop can run on anything that reads and
/// writes bytes; the server uses it with `TcpStream`.
pub struct ConnectionHandler<S> {
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The byte stream for this connection
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing commands
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            stats,
        }
    }

    /// Runs the connection loop until the client disconnects or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::Io(io_err)) if is_disconnect(io_err) => {
                debug!(client = %self.addr, error = %io_err, "Connection dropped by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    /// The read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(response) = self.next_response() {
                self.send_response(&response).await?;
            }

            if !self.read_more_data().await? {
                break;
            }
        }

        // The peer closed its side with an unterminated frame still buffered;
        // it is answered as the final command.
        if !self.buffer.is_empty() {
            let frame = self.buffer.split();
            let response = self.process(&frame);
            self.send_response(&response).await?;
        }

        Ok(())
    }

    /// Executes the next complete frame in the buffer, if there is one.
    fn next_response(&mut self) -> Option<Response> {
        let (response, consumed) = {
            let (frame, consumed) = next_frame(&self.buffer)?;
            (self.process(frame), consumed)
        };
        self.buffer.advance(consumed);

        trace!(
            client = %self.addr,
            consumed = consumed,
            remaining = self.buffer.len(),
            "Processed frame"
        );
        Some(response)
    }

    fn process(&self, frame: &[u8]) -> Response {
        let response = match self.command_handler.interpret(frame) {
            Ok(snapshot) => Response::Ok(snapshot),
            Err(e) => {
                debug!(
                    client = %self.addr,
                    frame = %String::from_utf8_lossy(frame),
                    error = %e,
                    "Rejected malformed command"
                );
                Response::Error
            }
        };
        self.stats.command_processed(&response);
        response
    }

    /// Reads more data from the stream into the buffer.
    ///
    /// Returns `false` once the peer has closed the connection.
    async fn read_more_data(&mut self) -> Result<bool, ConnectionError> {
        if self.buffer.len() >= MAX_FRAME_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Frame size limit exceeded"
            );
            return Err(ConnectionError::FrameTooLong(self.buffer.len()));
        }

        self.buffer.reserve(READ_CHUNK_SIZE);

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Ok(false);
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(true)
    }

    /// Writes one complete response frame, end-of-response separator included.
    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let mut bytes = response.serialize();
        bytes.push(SEP);

        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent response"
        );
        Ok(())
    }
}

fn is_disconnect(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
    )
}

/// Errors that end a connection.
///
/// Malformed commands are not among them: those are answered with `error`
/// and the connection stays open.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame grew past the size limit without a separator
    #[error("frame too long: {0} bytes without a separator")]
    FrameTooLong(usize),
}

/// Handles a client connection.
///
/// Creates a [`ConnectionHandler`] and runs it to completion. Errors are
/// logged by the handler and end only this connection.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    if let Err(e) = handler.run().await {
        trace!(client = %addr, error = %e, "Connection ended with error");
    }
}
