//! Error types for the match layer.

use rally_protocol::Side;

/// Errors returned by [`MatchHandle`](crate::MatchHandle) calls.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Someone is already playing this side.
    #[error("the {0} seat is already taken")]
    SeatTaken(Side),

    /// The match is past the point where players can join.
    #[error("match is not accepting players while {0}")]
    NotAccepting(String),

    /// The actor has stopped, or its command channel is closed.
    #[error("match is unavailable")]
    Unavailable,
}
