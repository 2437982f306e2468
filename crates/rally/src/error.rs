//! Unified error type for the Rally server.

use rally_match::MatchError;
use rally_protocol::ProtocolError;
use rally_session::SessionError;
use rally_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RallyError {
    /// Socket-level failure (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Framing or payload failure on a connection.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Seat assignment failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The match actor refused a request or has stopped.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// The match actor's task panicked or was cancelled.
    #[error("match task failed: {0}")]
    MatchTask(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
