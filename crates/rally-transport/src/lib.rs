//! Transport layer for Rally.
//!
//! Provides the [`Transport`] and [`Connection`] traits over a plain TCP
//! byte stream. The transport knows nothing about messages: a [`Connection`]
//! hands out whatever chunk of bytes the socket produced, and framing is the
//! protocol layer's job.
//!
//! A connection is shared between exactly two tasks: the reader (the only
//! caller of [`Connection::recv`]) and the writer (the only caller of
//! [`Connection::send`] and [`Connection::close`]). The read and write halves
//! are locked independently, so a writer stuck on a slow peer never blocks
//! the reader.

#![allow(async_fn_in_trait)]

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{TcpConnection, TcpTransport};

use std::fmt;
use std::net::SocketAddr;

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

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops handing out new connections. Later calls to
    /// [`accept`](Self::accept) fail.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A single byte-stream connection.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Writes all of `data` to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads the next chunk of bytes from the remote peer.
    ///
    /// Returns `Ok(None)` on a zero-length read, i.e. the peer closed its
    /// side of the stream.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Shuts down the write side of the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the remote peer's address.
    fn peer_addr(&self) -> SocketAddr;
}
