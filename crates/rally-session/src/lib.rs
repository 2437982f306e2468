//! Player seating for Rally.
//!
//! A match has exactly two seats. [`SessionManager`] hands them out in
//! connection order (LEFT first, then RIGHT), turns away anyone else while
//! both are taken, and frees a seat when its connection dies.
//!
//! ```text
//! Match layer (above)      ← runs once both seats are filled
//!     ↕
//! Session layer (this crate)  ← which connection plays which side
//!     ↕
//! Transport / Protocol (below) ← ConnectionId, Side
//! ```

mod error;
mod manager;

pub use error::SessionError;
pub use manager::SessionManager;
