//! Enrollment protocol - Transport Layer
//!
//! This module provides:
//!
//! - **Frame encoding/decoding**: [`Frame`] and the length-prefixed wire format
//! - **Async frame I/O**: [`read_frame`] / [`write_frame`] over any tokio stream
//! - **Connection setup**: [`connect`] / [`close`] for the TCP transport
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Enrollment State Machine         │
//! ├─────────────────────────────────────────┤
//! │         Transport Layer                 │  ← This module
//! │   frames, codec, connection             │
//! ├─────────────────────────────────────────┤
//! │              TCP                        │
//! └─────────────────────────────────────────┘
//! ```

mod codec;
mod connection;
mod error;
mod frame;

pub use codec::{read_frame, write_frame};
pub use connection::{close, connect, resolve};
pub use error::*;
pub use frame::*;
