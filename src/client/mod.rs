//! Enrollment protocol - Client Library
//!
//! The enrollment state machine and the high-level client built on it.

#[allow(clippy::module_inception)]
mod client;
mod identity;
mod session;

pub use client::*;
pub use identity::*;
pub use session::*;
