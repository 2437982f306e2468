//! # Rally
//!
//! Authoritative two-player pong server.
//!
//! The server seats two TCP clients, simulates the game at a fixed tick
//! rate, streams the world to both players every tick, and runs a rematch
//! vote when someone wins. Clients only send paddle directions and votes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rally::prelude::*;
//!
//! # async fn demo() -> Result<(), RallyError> {
//! let server = RallyServer::builder()
//!     .bind("0.0.0.0:12345")
//!     .config(MatchConfig { win_score: 3, ..MatchConfig::default() })
//!     .build()
//!     .await?;
//! let outcome = server.run().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use error::RallyError;
pub use server::{RallyServer, RallyServerBuilder};

pub use rally_match::{FieldConfig, MatchConfig, MatchOutcome, ShutdownReason};
pub use rally_protocol::{ClientMessage, ServerMessage, Side};

/// Everything needed to embed a server.
pub mod prelude {
    pub use crate::{
        FieldConfig, MatchConfig, MatchOutcome, RallyError, RallyServer, RallyServerBuilder,
        ServerConfig, ShutdownReason,
    };
}
