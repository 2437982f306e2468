//! Client side of Rally.
//!
//! [`RallyClient`] speaks the wire protocol over TCP. [`ShadowState`] keeps
//! the newest authoritative snapshot so a renderer has something to draw
//! between broadcasts. The client never simulates; everything it shows
//! came from the server.

mod client;
mod error;
mod shadow;

pub use client::{Assignment, RallyClient};
pub use error::ClientError;
pub use shadow::{ShadowEvent, ShadowState};
