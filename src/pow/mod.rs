//! Enrollment protocol - Proof of Work
//!
//! Parallel search for a nonce such that
//! `SHA-256(prefix ‖ nonce ‖ suffix)` starts with a required number of zero
//! bytes. Each attempt is an independent trial with success probability
//! `2^-(8 * required_zero_bytes)`; workers keep drawing random nonces until
//! one of them wins.
//!
//! - [`PowSolver`]: runs the worker threads and returns exactly one [`Solution`]
//! - [`CancelToken`]: aborts a running search from another thread or task
//! - [`verify`]: cheap check of a solved message

mod cancel;
mod digest;
mod solver;

pub use cancel::{CancelOnDrop, CancelToken};
pub use digest::{has_leading_zero_bytes, sha256, verify};
pub use solver::{PowError, PowSolver, Solution, SolverConfig, default_workers};
