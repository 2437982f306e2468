//! The authoritative simulation.
//!
//! [`MatchState`] is plain data plus a deterministic [`step`](MatchState::step):
//! the same inputs from the same starting state always produce the same
//! world, bit for bit. It knows nothing about sockets, clocks or phases;
//! the match actor owns one and decides when to step it.

use rally_protocol::{BallState, Direction, Paddles, Scores, Side, StateSnapshot};

use crate::FieldConfig;

/// What happened during one [`MatchState::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepEvents {
    /// Side whose paddle returned the ball.
    pub paddle_hit: Option<Side>,
    pub wall_hit: bool,
    /// Side that scored this tick.
    pub scored: Option<Side>,
    /// Set on the tick a side reaches the win score.
    pub winner: Option<Side>,
}

/// The world: ball, paddles, scores and the broadcast counter.
#[derive(Debug, Clone)]
pub struct MatchState {
    field: FieldConfig,
    win_score: u32,
    ball: BallState,
    /// Paddle top edges, indexed by [`Side::index`].
    paddles: [f32; 2],
    scores: Scores,
    sync: u64,
    /// Side that gave up the most recent point. Receives the next serve.
    last_conceded: Side,
}

impl MatchState {
    /// A fresh match. The opening serve goes toward LEFT.
    pub fn new(field: FieldConfig, win_score: u32) -> Self {
        let field = field.validated();
        let mut state = Self {
            field,
            win_score: win_score.max(1),
            ball: BallState {
                x: 0.0,
                y: 0.0,
                vx: 0.0,
                vy: 0.0,
            },
            paddles: [field.paddle_home(); 2],
            scores: Scores::default(),
            sync: 0,
            last_conceded: Side::Left,
        };
        state.serve(Side::Left);
        state
    }

    /// Advances the world by one tick using each side's latest direction.
    pub fn step(&mut self, inputs: [Direction; 2]) -> StepEvents {
        let mut events = StepEvents::default();

        for side in Side::ALL {
            self.move_paddle(side, inputs[side.index()]);
        }

        self.ball.x += self.ball.vx;
        self.ball.y += self.ball.vy;

        events.wall_hit = self.bounce_off_walls();
        events.paddle_hit = self.bounce_off_paddles();

        if let Some(scorer) = self.goal_scorer() {
            let total = self.scores.award(scorer);
            events.scored = Some(scorer);
            self.last_conceded = scorer.opposite();
            self.serve(self.last_conceded);
            self.paddles = [self.field.paddle_home(); 2];

            if total >= self.win_score {
                events.winner = Some(scorer);
            }
        }

        events
    }

    /// Resets the world for a rematch: scores zeroed, paddles re-homed,
    /// ball served from the centre toward the side that conceded last.
    /// The sync counter keeps counting.
    pub fn reset_for_rematch(&mut self) {
        self.scores = Scores::default();
        self.paddles = [self.field.paddle_home(); 2];
        self.serve(self.last_conceded);
    }

    /// Bumps the sync counter and returns the snapshot to broadcast.
    pub fn next_snapshot(&mut self) -> StateSnapshot {
        self.sync += 1;
        self.snapshot()
    }

    /// The current world, stamped with the last broadcast sync value.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            ball: self.ball,
            paddles: Paddles {
                left: self.paddles[Side::Left.index()],
                right: self.paddles[Side::Right.index()],
            },
            scores: self.scores,
            sync: self.sync,
        }
    }

    pub fn ball(&self) -> BallState {
        self.ball
    }

    pub fn paddle(&self, side: Side) -> f32 {
        self.paddles[side.index()]
    }

    pub fn scores(&self) -> Scores {
        self.scores
    }

    pub fn sync(&self) -> u64 {
        self.sync
    }

    pub fn last_conceded(&self) -> Side {
        self.last_conceded
    }

    pub fn field(&self) -> &FieldConfig {
        &self.field
    }

    // -- internals --------------------------------------------------------

    fn serve(&mut self, toward: Side) {
        let speed = self.field.serve_speed;
        self.ball = BallState {
            x: self.field.width / 2.0,
            y: self.field.height / 2.0,
            vx: match toward {
                Side::Left => -speed,
                Side::Right => speed,
            },
            vy: 0.0,
        };
    }

    fn move_paddle(&mut self, side: Side, direction: Direction) {
        let delta = match direction {
            Direction::Up => -self.field.paddle_speed,
            Direction::Down => self.field.paddle_speed,
            Direction::None => return,
        };
        let (min, max) = self.field.paddle_bounds();
        let paddle = &mut self.paddles[side.index()];
        *paddle = (*paddle + delta).clamp(min, max);
    }

    fn bounce_off_walls(&mut self) -> bool {
        let half = self.field.ball_size / 2.0;
        let top = self.field.wall + half;
        let bottom = self.field.height - self.field.wall - half;

        if self.ball.y < top {
            self.ball.y = top;
            self.ball.vy = self.ball.vy.abs();
            true
        } else if self.ball.y > bottom {
            self.ball.y = bottom;
            self.ball.vy = -self.ball.vy.abs();
            true
        } else {
            false
        }
    }

    /// Only the paddle the ball is travelling toward can return it. The
    /// contact zone is the paddle's own width plus the ball, which is
    /// wider than the fastest ball moves in one tick, so no hit is skipped.
    fn bounce_off_paddles(&mut self) -> Option<Side> {
        let side = if self.ball.vx < 0.0 {
            Side::Left
        } else if self.ball.vx > 0.0 {
            Side::Right
        } else {
            return None;
        };

        let half = self.field.ball_size / 2.0;
        let px = self.field.paddle_x(side);
        let top = self.paddles[side.index()];
        let bottom = top + self.field.paddle_height;

        let overlaps_x =
            self.ball.x + half >= px && self.ball.x - half <= px + self.field.paddle_width;
        let overlaps_y = self.ball.y + half >= top && self.ball.y - half <= bottom;
        if !(overlaps_x && overlaps_y) {
            return None;
        }

        let speed = (self.ball.vx.abs() + self.field.bounce_speedup).min(self.field.max_ball_speed);
        let reach = self.field.paddle_height / 2.0 + half;
        let offset = ((self.ball.y - (top + self.field.paddle_height / 2.0)) / reach).clamp(-1.0, 1.0);

        match side {
            Side::Left => {
                self.ball.x = px + self.field.paddle_width + half;
                self.ball.vx = speed;
            }
            Side::Right => {
                self.ball.x = px - half;
                self.ball.vx = -speed;
            }
        }
        self.ball.vy = offset * self.field.max_bounce_vy;
        Some(side)
    }

    fn goal_scorer(&self) -> Option<Side> {
        if self.ball.x < 0.0 {
            Some(Side::Right)
        } else if self.ball.x > self.field.width {
            Some(Side::Left)
        } else {
            None
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
