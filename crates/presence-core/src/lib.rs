//! Presence lifecycle controller for presenced
//!
//! This crate is the heart of presenced, containing:
//! - The watchdog state machine (Idle -> Scanning -> Attached -> Scanning)
//! - Session handle ownership (exactly one connection, no half-open state)
//! - The timestamp policy (relative start instants)
//! - Keep-alive refresh scheduling
//!
//! Everything here is synchronous and runtime-free: the daemon drives the
//! controller from its event loop, one tick at a time, so no two tick
//! handlers ever interleave.

mod controller;
mod events;
mod session;
mod timestamp;

pub use controller::*;
pub use events::*;
pub use session::*;
pub use timestamp::*;
