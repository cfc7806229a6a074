//! Boundary trait interfaces for presenced
//!
//! The core never talks to the outside world directly. It goes through:
//! - [`PresenceClient`]: the session-establishment client to the companion
//!   process (connect/publish/close)
//! - [`ProcessProbe`]: "is executable X currently running?"
//!
//! Mock implementations for both live here too, so every consumer tests
//! against the same fakes.

mod handle;
mod mock;
mod traits;

pub use handle::*;
pub use mock::*;
pub use traits::*;
