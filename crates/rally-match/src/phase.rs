//! Match lifecycle and rematch voting.
//!
//! ```text
//! WaitingForPlayers ──BothSeated──→ Playing ──WinReached──→ Won
//!                                     ↑                      │ OpenVoting
//!                                     │                      ▼
//!                                  Restarting ←─unanimous── Voting
//!                                                            │ deadline / peer lost
//!                                                            ▼
//!                                                       ShuttingDown
//! ```
//!
//! Every input to the machine, including the deadline firing, goes through
//! [`MatchPhase::apply`] on the match actor's task. A vote and a deadline
//! that arrive together are therefore handled one after the other, and
//! whichever is applied first decides the outcome. Events that make no
//! sense in the current phase are ignored.

use std::fmt;

use rally_protocol::Side;
use tokio::time::Instant;

/// Per-side "play again" flags plus the shared voting deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RematchBallot {
    votes: [bool; 2],
    deadline: Instant,
}

impl RematchBallot {
    /// A ballot with both flags cleared.
    pub fn new(deadline: Instant) -> Self {
        Self {
            votes: [false; 2],
            deadline,
        }
    }

    /// Records a yes vote. Returns `false` if `side` had already voted.
    pub fn cast(&mut self, side: Side) -> bool {
        let slot = &mut self.votes[side.index()];
        let fresh = !*slot;
        *slot = true;
        fresh
    }

    pub fn has_voted(&self, side: Side) -> bool {
        self.votes[side.index()]
    }

    pub fn is_unanimous(&self) -> bool {
        self.votes.iter().all(|v| *v)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The voting window closed without both players voting yes.
    RematchDeclined,
    /// A player's connection died.
    PeerDisconnected(Side),
    /// The server asked the match to stop.
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RematchDeclined => write!(f, "rematch declined"),
            Self::PeerDisconnected(side) => write!(f, "{side} player disconnected"),
            Self::Requested => write!(f, "shutdown requested"),
        }
    }
}

/// Inputs to the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// The second seat was filled.
    BothSeated,
    /// A side reached the win score.
    WinReached(Side),
    /// Start the voting window.
    OpenVoting { deadline: Instant },
    /// A side voted yes.
    Vote(Side),
    /// The clock reached `now`. Closes voting if the deadline has passed.
    DeadlineReached(Instant),
    /// The world has been reset for the rematch.
    Restarted,
    /// A side's connection died.
    PeerLost(Side),
    /// Stop the match.
    Shutdown,
}

/// Where the match is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MatchPhase {
    #[default]
    WaitingForPlayers,
    Playing,
    Won {
        winner: Side,
    },
    Voting {
        winner: Side,
        ballot: RematchBallot,
    },
    Restarting,
    ShuttingDown {
        reason: ShutdownReason,
    },
}

impl MatchPhase {
    /// Applies an event. Returns `true` if the event was accepted (the phase
    /// changed, or a vote was recorded).
    pub fn apply(&mut self, event: PhaseEvent) -> bool {
        let next = match (&mut *self, event) {
            (Self::ShuttingDown { .. }, _) => return false,

            (Self::WaitingForPlayers, PhaseEvent::BothSeated) => Self::Playing,
            // A seat emptied before the match began; keep waiting.
            (Self::WaitingForPlayers, PhaseEvent::PeerLost(_)) => return false,

            (Self::Playing, PhaseEvent::WinReached(winner)) => Self::Won { winner },

            (Self::Won { winner }, PhaseEvent::OpenVoting { deadline }) => Self::Voting {
                winner: *winner,
                ballot: RematchBallot::new(deadline),
            },

            (Self::Voting { ballot, .. }, PhaseEvent::Vote(side)) => {
                if !ballot.cast(side) {
                    return false;
                }
                if !ballot.is_unanimous() {
                    return true;
                }
                Self::Restarting
            }

            (Self::Voting { ballot, .. }, PhaseEvent::DeadlineReached(now)) => {
                if now < ballot.deadline() {
                    return false;
                }
                Self::ShuttingDown {
                    reason: ShutdownReason::RematchDeclined,
                }
            }

            (Self::Restarting, PhaseEvent::Restarted) => Self::Playing,

            (_, PhaseEvent::PeerLost(side)) => Self::ShuttingDown {
                reason: ShutdownReason::PeerDisconnected(side),
            },

            (_, PhaseEvent::Shutdown) => Self::ShuttingDown {
                reason: ShutdownReason::Requested,
            },

            _ => return false,
        };

        tracing::debug!(from = %self, to = %next, ?event, "phase transition");
        *self = next;
        true
    }

    /// The voting deadline, while voting is open.
    pub fn deadline(&self) -> Option<Instant> {
        match self {
            Self::Voting { ballot, .. } => Some(ballot.deadline()),
            _ => None,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    pub fn is_voting(&self) -> bool {
        matches!(self, Self::Voting { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ShuttingDown { .. })
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForPlayers => write!(f, "WaitingForPlayers"),
            Self::Playing => write!(f, "Playing"),
            Self::Won { .. } => write!(f, "Won"),
            Self::Voting { .. } => write!(f, "Voting"),
            Self::Restarting => write!(f, "Restarting"),
            Self::ShuttingDown { .. } => write!(f, "ShuttingDown"),
        }
    }
}
