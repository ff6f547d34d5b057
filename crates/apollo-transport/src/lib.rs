//! Transport abstraction layer for Apollo.
//!
//! Provides the [`Transport`] and [`Connection`] traits. A connection is a
//! duplex byte pipe driven by two loops that run for the lifetime of the
//! session:
//!
//! - the **read pump** pulls frames off the wire and hands each one to the
//!   reader channel attached with [`Connection::attach_reader`];
//! - the **write pump** drains frames queued by [`Connection::send`] and
//!   keeps the peer alive with protocol-level pings.
//!
//! [`Connection::close`] drops the outbound queue, which makes the write pump
//! send a close frame and exit, and stops the read pump.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport, websocket_config};

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Deadlines and limits applied to every connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Longest the read pump waits for the next frame before giving up.
    pub read_wait: Duration,
    /// Interval between heartbeat pings sent by the write pump.
    pub ping_period: Duration,
    /// Longest a single write may take.
    pub write_wait: Duration,
    /// Largest inbound frame accepted, in bytes. Anything bigger closes
    /// the connection.
    pub max_message_size: usize,
    /// Frames that may be queued for the write pump before `send` waits.
    pub outbound_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_wait: Duration::from_secs(60),
            ping_period: Duration::from_secs(25),
            write_wait: Duration::from_secs(10),
            max_message_size: 512,
            outbound_capacity: 256,
        }
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// A single duplex connection.
///
/// All methods take `&self` so one connection can be shared (behind an
/// `Arc`) between its two pumps and the actor that owns the session.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sets the channel inbound frames are delivered to. Must be called
    /// before the read pump starts.
    fn attach_reader(&self, reader: mpsc::Sender<Vec<u8>>);

    /// Queues one frame for the write pump.
    ///
    /// Waits while the outbound queue is full. Fails once the connection
    /// has been closed or the write pump has exited.
    fn send(
        &self,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Runs the read loop until the peer closes, a deadline passes, a
    /// frame is oversized, or [`close`](Self::close) is called.
    fn read_pump(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Runs the write loop until the outbound queue is closed or a write
    /// fails.
    fn write_pump(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Closes the connection. Calling it more than once is a no-op.
    fn close(&self);

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
