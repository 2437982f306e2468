//! The client's copy of the world.
//!
//! The server is the only authority. `ShadowState` just remembers the
//! newest snapshot it has seen and turns each server message into a
//! [`ShadowEvent`] a renderer can act on.

use rally_protocol::{
    BallState, CloseReason, FieldSpec, RematchOutcome, Scores, ServerMessage, Side, StateSnapshot,
};

/// What a server message meant to the client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShadowEvent {
    /// The server told us which side we play.
    Assigned { side: Side },
    /// A newer snapshot was applied.
    Updated,
    /// A newer snapshot was applied and `scorer` gained a point.
    ScoreChanged { scorer: Side, scores: Scores },
    /// The snapshot was not newer than the last applied one and was dropped.
    Stale { sync: u64 },
    GameOver { winner: Side },
    RematchResult { outcome: RematchOutcome },
    Closing { reason: CloseReason },
}

/// Locally held view of the match, fed only by server messages.
#[derive(Debug, Clone, Default)]
pub struct ShadowState {
    side: Option<Side>,
    field: Option<FieldSpec>,
    win_score: u32,
    latest: Option<StateSnapshot>,
    winner: Option<Side>,
    closed: Option<CloseReason>,
}

impl ShadowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one server message into the shadow state.
    pub fn apply(&mut self, msg: ServerMessage) -> ShadowEvent {
        match msg {
            ServerMessage::AssignSide {
                side,
                field,
                win_score,
            } => {
                self.side = Some(side);
                self.field = Some(field);
                self.win_score = win_score;
                ShadowEvent::Assigned { side }
            }
            ServerMessage::State(snapshot) => self.apply_snapshot(snapshot),
            ServerMessage::GameOver { winner } => {
                self.winner = Some(winner);
                ShadowEvent::GameOver { winner }
            }
            ServerMessage::RematchResult { outcome } => {
                if outcome == RematchOutcome::Restarting {
                    self.winner = None;
                }
                ShadowEvent::RematchResult { outcome }
            }
            ServerMessage::Closing { reason } => {
                self.closed = Some(reason);
                ShadowEvent::Closing { reason }
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: StateSnapshot) -> ShadowEvent {
        let previous = self.latest;
        if let Some(prev) = previous {
            if snapshot.sync <= prev.sync {
                tracing::trace!(sync = snapshot.sync, last = prev.sync, "dropping stale state");
                return ShadowEvent::Stale {
                    sync: snapshot.sync,
                };
            }
        }
        self.latest = Some(snapshot);

        let before = previous.map(|p| p.scores).unwrap_or_default();
        let after = snapshot.scores;
        let scorer = if after.left > before.left {
            Some(Side::Left)
        } else if after.right > before.right {
            Some(Side::Right)
        } else {
            None
        };
        match scorer {
            Some(scorer) => ShadowEvent::ScoreChanged {
                scorer,
                scores: after,
            },
            None => ShadowEvent::Updated,
        }
    }

    /// Our side, once assigned.
    pub fn side(&self) -> Option<Side> {
        self.side
    }

    pub fn field(&self) -> Option<&FieldSpec> {
        self.field.as_ref()
    }

    pub fn win_score(&self) -> u32 {
        self.win_score
    }

    /// Newest applied snapshot.
    pub fn latest(&self) -> Option<&StateSnapshot> {
        self.latest.as_ref()
    }

    /// Sync counter of the newest applied snapshot, 0 before the first.
    pub fn last_sync(&self) -> u64 {
        self.latest.map_or(0, |s| s.sync)
    }

    pub fn scores(&self) -> Scores {
        self.latest.map(|s| s.scores).unwrap_or_default()
    }

    /// Winner of the game just finished, until a rematch starts.
    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    /// Why the server closed the connection, if it said.
    pub fn closed(&self) -> Option<CloseReason> {
        self.closed
    }

    /// Top edge of the other player's paddle.
    pub fn opponent_paddle(&self) -> Option<f32> {
        let side = self.side?;
        self.latest.map(|s| s.paddles.get(side.opposite()))
    }

    /// Where the ball would be `ticks` ticks after the latest snapshot,
    /// assuming it hits nothing. Lets a renderer running faster than the
    /// broadcast rate move the ball smoothly between snapshots.
    pub fn extrapolated_ball(&self, ticks: f32) -> Option<BallState> {
        self.latest.map(|s| BallState {
            x: s.ball.x + s.ball.vx * ticks,
            y: s.ball.y + s.ball.vy * ticks,
            ..s.ball
        })
    }
}
