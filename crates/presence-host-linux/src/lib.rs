//! Linux host adapter for presenced
//!
//! Implements the host traits against a real Linux system:
//! - [`LinuxProcessProbe`]: target detection by scanning `/proc`
//! - [`CompanionSocketClient`]: presence transport over the companion's
//!   Unix socket

mod companion;
mod probe;

pub use companion::*;
pub use probe::*;
