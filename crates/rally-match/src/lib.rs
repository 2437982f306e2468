//! The match layer for Rally.
//!
//! One match runs as a single Tokio task (actor model) that owns the
//! authoritative world, steps it at a fixed rate, broadcasts every tick to
//! both seats, and runs the rematch vote when a side wins.
//!
//! # Key types
//!
//! - [`MatchState`]: deterministic pong simulation
//! - [`MatchPhase`]: lifecycle and rematch voting state machine
//! - [`MatchHandle`]: send commands to a running match actor
//! - [`Outbox`]: bounded, drop-oldest queue to one connection
//! - [`MatchConfig`] / [`FieldConfig`]: tunables

mod actor;
mod config;
mod engine;
mod error;
mod outbox;
mod phase;

pub use actor::{spawn_match, MatchHandle, MatchInfo, MatchOutcome};
pub use config::{FieldConfig, MatchConfig};
pub use engine::{MatchState, StepEvents};
pub use error::MatchError;
pub use outbox::{Outbox, OutboxReceiver};
pub use phase::{MatchPhase, PhaseEvent, RematchBallot, ShutdownReason};
