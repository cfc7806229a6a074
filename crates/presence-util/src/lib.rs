//! Shared utilities for presenced
//!
//! This crate provides:
//! - ID types (ProfileId, SessionId, ClientId)
//! - Time helpers (UTC/local wrappers, mock time for development)
//! - Default paths for the socket and data directory

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
