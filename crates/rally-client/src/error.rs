//! Error types for the client.

use rally_protocol::{CloseReason, ProtocolError};
use rally_transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server's first message was not a side assignment.
    #[error("expected a side assignment, got {0}")]
    NotAssigned(String),

    /// The server turned us away before assigning a side.
    #[error("server refused the connection: {0:?}")]
    Rejected(CloseReason),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The server closed the connection before assigning a side.
    #[error("server closed the connection during setup")]
    ClosedDuringSetup,
}
