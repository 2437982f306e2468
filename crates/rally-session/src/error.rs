//! Error types for the session layer.

use rally_protocol::Side;
use rally_transport::ConnectionId;

/// Errors from seat management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Both seats are taken. The caller should send a `match_full`
    /// notice and close the connection.
    #[error("match is full, rejecting {0}")]
    MatchFull(ConnectionId),

    /// The connection already holds a seat.
    #[error("{conn} already holds the {side} seat")]
    AlreadySeated { conn: ConnectionId, side: Side },
}
