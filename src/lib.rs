//! # Enroll Client
//!
//! Client for a challenge-response enrollment service. The server issues an
//! 8-byte challenge; the client answers with a registration request that
//! carries a proof-of-work nonce, and the server accepts or rejects it.
//!
//! ```text
//!   client                               server
//!     │ ◀──────── ENROLL INIT (challenge) ──│
//!     │   solve SHA-256 proof of work        │
//!     │ ── ENROLL REGISTER (nonce, identity) ▶│
//!     │ ◀──── ENROLL SUCCESS / FAILURE ─────│
//! ```
//!
//! ## Feature Flags
//!
//! - `transport` (default): Frame codec and TCP connection
//! - `pow` (default): Parallel proof-of-work solver
//! - `client` (default): Session state machine and client facade
//! - `cli` (default): The `enroll-client` binary
//!
//! ## Modules
//!
//! - [`core`]: Constants, message types and errors (always included)
//! - [`transport`]: Framing and connection (requires `transport` feature)
//! - [`pow`]: Proof-of-work solver (requires `pow` feature)
//! - [`client`]: Enrollment session and client (requires `client` feature)
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use enroll_client::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = EnrollClientBuilder::new()
//!     .identity(Identity::new("ada@example.com", "Ada", "Lovelace")?)
//!     .build()?;
//!
//! match client.enroll().await? {
//!     EnrollmentOutcome::Success { team_number } => println!("enrolled as team {team_number}"),
//!     EnrollmentOutcome::Failure(reason) => eprintln!("enrollment failed: {reason}"),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Proof of work (feature-gated)
#[cfg(feature = "pow")]
#[cfg_attr(docsrs, doc(cfg(feature = "pow")))]
pub mod pow;

// Client API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    #[cfg(feature = "transport")]
    pub use crate::transport::{Frame, FrameError, TransportError, TransportResult};

    #[cfg(feature = "pow")]
    pub use crate::pow::{CancelOnDrop, CancelToken, PowError, PowSolver, Solution, SolverConfig};

    #[cfg(feature = "client")]
    pub use crate::client::{
        EnrollClient, EnrollClientBuilder, EnrollError, EnrollmentOutcome, FailureReason,
        Identity, Session, SessionConfig, SessionError, SessionState, run_session,
    };
}

// Re-export commonly used items at crate root
pub use crate::core::{Challenge, ConfigError, MsgType, ProtocolError};

#[cfg(feature = "client")]
pub use client::{EnrollClient, EnrollClientBuilder, EnrollError, EnrollmentOutcome};
