//! Wire protocol for Rally.
//!
//! This crate defines what clients and the server say to each other and how
//! it is laid out on a TCP stream:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`StateSnapshot`], ...)
//!   are the records that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) turns one record into one
//!   payload and back.
//! - **Framing** ([`encode_frame`], [`FrameDecoder`]) delimits payloads with
//!   a newline so they can be split back out of the byte stream.
//! - **Errors** ([`ProtocolError`]) covers all of the above.
//!
//! ```text
//! Transport (bytes) → Framing (lines) → Codec (messages) → Match
//! ```

mod codec;
mod error;
pub mod frame;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use frame::{DELIMITER, FrameDecoder, MAX_FRAME_LEN, decode_frames, encode_frame};
pub use types::{
    BallState, ClientMessage, CloseReason, Direction, FieldSpec, Paddles, RematchOutcome,
    Scores, ServerMessage, Side, StateSnapshot,
};
