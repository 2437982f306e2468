//! The seat registry.
//!
//! `SessionManager` is owned by the server's accept loop and is not shared,
//! so it is a plain struct with no locking.

use rally_protocol::Side;
use rally_transport::ConnectionId;

use crate::SessionError;

/// Tracks which connection occupies each side.
///
/// ```text
///            admit()            admit()
///   [ -, - ] ───────→ [ L, - ] ───────→ [ L, R ]  ← further admits: MatchFull
///                        ↑                  │
///                        └─── release(R) ───┘
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    /// Indexed by [`Side::index`].
    seats: [Option<ConnectionId>; 2],
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seats a connection on the first free side, LEFT before RIGHT.
    ///
    /// # Errors
    /// - [`SessionError::MatchFull`] if both seats are taken
    /// - [`SessionError::AlreadySeated`] if `conn` already has a seat
    pub fn admit(&mut self, conn: ConnectionId) -> Result<Side, SessionError> {
        if let Some(side) = self.side_of(conn) {
            return Err(SessionError::AlreadySeated { conn, side });
        }

        let side = Side::ALL
            .into_iter()
            .find(|side| self.seats[side.index()].is_none())
            .ok_or(SessionError::MatchFull(conn))?;

        self.seats[side.index()] = Some(conn);
        tracing::info!(%conn, %side, "side assigned");
        Ok(side)
    }

    /// Frees a seat. Returns the connection that held it, if any.
    pub fn release(&mut self, side: Side) -> Option<ConnectionId> {
        let conn = self.seats[side.index()].take();
        if let Some(conn) = conn {
            tracing::info!(%conn, %side, "seat released");
        }
        conn
    }

    /// Which side a connection is playing, if it holds a seat.
    pub fn side_of(&self, conn: ConnectionId) -> Option<Side> {
        Side::ALL
            .into_iter()
            .find(|side| self.seats[side.index()] == Some(conn))
    }

    /// The connection seated on `side`.
    pub fn occupant(&self, side: Side) -> Option<ConnectionId> {
        self.seats[side.index()]
    }

    /// Number of taken seats (0, 1 or 2).
    pub fn occupied(&self) -> usize {
        self.seats.iter().filter(|seat| seat.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.occupied() == self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied() == 0
    }
}

// =========================================================================
// Tests
// =========================================================================
