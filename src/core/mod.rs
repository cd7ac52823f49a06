//! Enrollment protocol - Core types and constants.
//!
//! This module has no I/O and no heavy dependencies. It defines the protocol
//! constants, the message type and challenge types, and the error taxonomy
//! shared by the transport, proof-of-work and client layers.

mod constants;
mod error;
mod types;

pub use constants::*;
pub use error::*;
pub use types::*;
