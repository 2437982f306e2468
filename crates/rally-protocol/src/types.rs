//! Core protocol types for Rally's wire format.
//!
//! Every message on the wire is one JSON object with a `"type"` tag:
//!
//! ```text
//! client → server   input, rematch_vote
//! server → client   assign_side, state, game_over, rematch_result, closing
//! ```
//!
//! Decoding is lenient where it can be: unknown fields are ignored, and an
//! unrecognized or missing paddle direction becomes [`Direction::None`]. An
//! unknown `type` or a missing required field is a malformed payload.

use std::fmt;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Which end of the playfield a player defends.
///
/// The first connection is always `Left`, and `Left` serves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, in seat order.
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    /// The other side.
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Index into per-side arrays: `Left` = 0, `Right` = 1.
    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// A paddle movement command.
///
/// Deserialization never fails on an unknown string: anything other than
/// `up`, `down`, `none` or the empty string is logged and read as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    #[default]
    None,
}

impl Direction {
    /// Maps a wire token to a direction, defaulting to `None`.
    pub fn from_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case("up") {
            Self::Up
        } else if token.eq_ignore_ascii_case("down") {
            Self::Down
        } else {
            if !(token.is_empty() || token.eq_ignore_ascii_case("none")) {
                tracing::warn!(token, "unrecognized direction token, treating as none");
            }
            Self::None
        }
    }
}

/// Any JSON value in the `direction` slot.
#[derive(Deserialize)]
#[serde(untagged)]
enum DirectionToken {
    Text(String),
    Other(IgnoredAny),
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match DirectionToken::deserialize(deserializer)? {
            DirectionToken::Text(token) => Ok(Self::from_token(&token)),
            DirectionToken::Other(_) => {
                tracing::warn!("non-string direction token, treating as none");
                Ok(Self::None)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot pieces
// ---------------------------------------------------------------------------

/// Playfield geometry, sent once in [`ServerMessage::AssignSide`] so the
/// client can lay out its screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub width: f32,
    pub height: f32,
    /// Thickness of the top and bottom walls.
    pub wall: f32,
    pub paddle_width: f32,
    pub paddle_height: f32,
    /// Side length of the (square) ball.
    pub ball_size: f32,
}

/// Ball centre and velocity (units per tick).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// Top edge of each paddle along the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Paddles {
    pub left: f32,
    pub right: f32,
}

impl Paddles {
    pub fn get(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Points per side. Only ever goes up within a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub left: u32,
    pub right: u32,
}

impl Scores {
    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Awards one point to `side` and returns its new total.
    pub fn award(&mut self, side: Side) -> u32 {
        let slot = match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        };
        *slot += 1;
        *slot
    }
}

/// One authoritative world snapshot, broadcast every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub ball: BallState,
    pub paddles: Paddles,
    pub scores: Scores,
    /// Broadcast counter. Strictly increasing, survives rematches.
    pub sync: u64,
}

// ---------------------------------------------------------------------------
// Outcomes and reasons
// ---------------------------------------------------------------------------

/// How the rematch vote resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RematchOutcome {
    Restarting,
    ShuttingDown,
}

/// Why the server is closing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CloseReason {
    /// Two players are already seated.
    MatchFull,
    /// The other player's connection died.
    PeerDisconnected { side: Side },
    /// The server is stopping for some other reason.
    ServerShutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchFull => write!(f, "match full"),
            Self::PeerDisconnected { side } => write!(f, "{side} player disconnected"),
            Self::ServerShutdown => write!(f, "server shutting down"),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Messages a client sends to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Latest desired paddle direction. Replaces the previous one. A
    /// missing direction reads as `None`.
    Input {
        #[serde(default)]
        direction: Direction,
    },
    /// "I want to play again." Only meaningful after a game over.
    RematchVote,
}

/// Messages the server sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message on every seated connection.
    AssignSide {
        side: Side,
        field: FieldSpec,
        win_score: u32,
    },
    /// Per-tick world snapshot.
    State(StateSnapshot),
    /// A side reached the win score. Voting opens right after.
    GameOver { winner: Side },
    /// Result of the rematch vote.
    RematchResult { outcome: RematchOutcome },
    /// The server is about to close this connection.
    Closing { reason: CloseReason },
}

impl ServerMessage {
    /// The sync counter, for `State` messages.
    pub fn sync(&self) -> Option<u64> {
        match self {
            Self::State(snapshot) => Some(snapshot.sync),
            _ => None,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
