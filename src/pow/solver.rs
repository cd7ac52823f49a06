//! Multi-threaded proof-of-work search.
//!
//! Every worker owns a private copy of the message buffer, its own SHA-256
//! state and its own CSPRNG. The only shared state is the stop flag, the
//! caller's [`CancelToken`] and the attempt counter.
//!
//! The first worker to find a valid nonce claims the win by raising the stop
//! flag, publishes into a single-slot channel and exits. Peers observe the
//! flag at their next attempt and exit too. [`PowSolver::solve`] joins every
//! worker before returning.

use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, bounded};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::cancel::CancelToken;
use super::digest::has_leading_zero_bytes;
use crate::core::{DIGEST_LEN, NONCE_LEN, REQUIRED_ZERO_BYTES};

/// Errors returned by the solver.
#[derive(Debug, Error)]
pub enum PowError {
    /// Solver parameters are out of range.
    #[error("invalid solver configuration: {0}")]
    InvalidConfig(String),

    /// The search was cancelled before a nonce was found.
    #[error("search cancelled")]
    Cancelled,

    /// Every worker died without producing a result.
    #[error("solver worker panicked")]
    WorkerPanicked,
}

/// Number of parallel execution units on this host.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Solver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    /// Worker thread count.
    pub workers: usize,
    /// Width of the nonce slot in bytes.
    pub nonce_width: usize,
    /// Leading digest bytes that must be zero.
    pub required_zero_bytes: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            nonce_width: NONCE_LEN,
            required_zero_bytes: REQUIRED_ZERO_BYTES,
        }
    }
}

impl SolverConfig {
    /// Check the parameters.
    pub fn validate(&self) -> Result<(), PowError> {
        if self.workers == 0 {
            return Err(PowError::InvalidConfig("worker count must be at least 1".into()));
        }
        if self.nonce_width == 0 {
            return Err(PowError::InvalidConfig("nonce width must be at least 1".into()));
        }
        if self.required_zero_bytes > DIGEST_LEN {
            return Err(PowError::InvalidConfig(format!(
                "required zero bytes {} exceeds digest length {}",
                self.required_zero_bytes, DIGEST_LEN
            )));
        }
        Ok(())
    }
}

/// A solved message.
#[derive(Debug, Clone)]
pub struct Solution {
    /// The winning nonce.
    pub nonce: Vec<u8>,
    /// `prefix ‖ nonce ‖ suffix`.
    pub message: Vec<u8>,
    /// SHA-256 of `message`.
    pub digest: [u8; DIGEST_LEN],
    /// Index of the worker that found the nonce.
    pub worker: usize,
    /// Workers that took part.
    pub workers: usize,
    /// Hashes computed by all workers together.
    pub attempts: u64,
    /// Wall-clock time of the search.
    pub elapsed: Duration,
}

impl Solution {
    /// Hashes per second over the whole search.
    pub fn hash_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.attempts as f64 / secs
        } else {
            self.attempts as f64
        }
    }
}

/// What a winning worker publishes.
struct Found {
    worker: usize,
    message: Vec<u8>,
    digest: [u8; DIGEST_LEN],
}

/// Worker bookkeeping. Only attached by tests checking the join barrier;
/// production searches pass `None` and pay nothing.
#[derive(Debug, Default)]
#[cfg_attr(not(test), allow(dead_code))]
struct WorkerProbe {
    started: AtomicUsize,
    live: AtomicUsize,
}

impl WorkerProbe {
    fn enter(&self) -> LiveGuard<'_> {
        self.started.fetch_add(1, Ordering::AcqRel);
        self.live.fetch_add(1, Ordering::AcqRel);
        LiveGuard(&self.live)
    }
}

/// Decrements the live count even if the worker unwinds.
struct LiveGuard<'a>(&'a AtomicUsize);

impl Drop for LiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Shared, read-only view of one search.
struct Search<'a> {
    template: &'a [u8],
    nonce_range: Range<usize>,
    required_zero_bytes: usize,
    stop: &'a AtomicBool,
    cancel: &'a CancelToken,
    attempts: &'a AtomicU64,
    probe: Option<&'a WorkerProbe>,
}

impl Search<'_> {
    fn halted(&self) -> bool {
        self.stop.load(Ordering::Acquire) || self.cancel.is_cancelled()
    }

    fn run_worker(&self, worker: usize, tx: Sender<Found>) {
        let _live = self.probe.map(WorkerProbe::enter);

        let mut buf = self.template.to_vec();
        let mut hasher = Sha256::new();
        let mut rng = StdRng::from_entropy();
        let mut local_attempts = 0u64;

        while !self.halted() {
            rng.fill_bytes(&mut buf[self.nonce_range.clone()]);
            hasher.update(&buf);
            let digest = hasher.finalize_reset();
            local_attempts += 1;

            if has_leading_zero_bytes(&digest, self.required_zero_bytes) {
                // Only the worker that flips the flag publishes
                if !self.stop.swap(true, Ordering::AcqRel) {
                    let mut out = [0u8; DIGEST_LEN];
                    out.copy_from_slice(&digest);
                    // Slot is free: this is the first and only send
                    let _ = tx.try_send(Found {
                        worker,
                        message: buf,
                        digest: out,
                    });
                }
                break;
            }
        }

        self.attempts.fetch_add(local_attempts, Ordering::Relaxed);
        tracing::trace!(worker, attempts = local_attempts, "pow worker exited");
    }
}

/// Parallel proof-of-work solver.
///
/// # Example
///
/// ```ignore
/// use enroll_client::pow::PowSolver;
///
/// let solver = PowSolver::new().workers(4).required_zero_bytes(2);
/// let solution = solver.solve(b"prefix", b"suffix")?;
/// assert_eq!(&solution.digest[..2], &[0, 0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PowSolver {
    config: SolverConfig,
}

impl PowSolver {
    /// Create a solver with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a solver from a configuration.
    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Set the worker count.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the nonce width.
    pub fn nonce_width(mut self, width: usize) -> Self {
        self.config.nonce_width = width;
        self
    }

    /// Set the difficulty.
    pub fn required_zero_bytes(mut self, count: usize) -> Self {
        self.config.required_zero_bytes = count;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Search for a nonce. Blocks until one is found.
    pub fn solve(&self, prefix: &[u8], suffix: &[u8]) -> Result<Solution, PowError> {
        self.solve_with_cancel(prefix, suffix, &CancelToken::new())
    }

    /// Search for a nonce until one is found or `cancel` is raised.
    ///
    /// All workers have exited when this returns, on every path.
    pub fn solve_with_cancel(
        &self,
        prefix: &[u8],
        suffix: &[u8],
        cancel: &CancelToken,
    ) -> Result<Solution, PowError> {
        self.search(prefix, suffix, cancel, None)
    }

    fn search(
        &self,
        prefix: &[u8],
        suffix: &[u8],
        cancel: &CancelToken,
        probe: Option<&WorkerProbe>,
    ) -> Result<Solution, PowError> {
        self.config.validate()?;
        let SolverConfig {
            workers,
            nonce_width,
            required_zero_bytes,
        } = self.config;

        let mut template = Vec::with_capacity(prefix.len() + nonce_width + suffix.len());
        template.extend_from_slice(prefix);
        template.resize(prefix.len() + nonce_width, 0);
        template.extend_from_slice(suffix);

        let stop = AtomicBool::new(false);
        let attempts = AtomicU64::new(0);
        let search = Search {
            template: &template,
            nonce_range: prefix.len()..prefix.len() + nonce_width,
            required_zero_bytes,
            stop: &stop,
            cancel,
            attempts: &attempts,
            probe,
        };

        tracing::debug!(
            workers,
            required_zero_bytes,
            message_len = template.len(),
            "starting proof-of-work search"
        );
        let started = Instant::now();

        let (tx, rx) = bounded::<Found>(1);
        let (found, panicked) = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let tx = tx.clone();
                    let search = &search;
                    scope.spawn(move || search.run_worker(worker, tx))
                })
                .collect();
            drop(tx);

            // Err means every sender is gone: cancelled or all workers died
            let found = rx.recv().ok();
            stop.store(true, Ordering::Release);

            let mut panicked = 0usize;
            for handle in handles {
                if handle.join().is_err() {
                    panicked += 1;
                }
            }
            (found, panicked)
        });

        let elapsed = started.elapsed();
        let attempts = attempts.load(Ordering::Relaxed);

        let Some(found) = found else {
            if panicked > 0 && !cancel.is_cancelled() {
                return Err(PowError::WorkerPanicked);
            }
            tracing::debug!(attempts, ?elapsed, "proof-of-work search cancelled");
            return Err(PowError::Cancelled);
        };

        let solution = Solution {
            nonce: found.message[search.nonce_range.clone()].to_vec(),
            message: found.message,
            digest: found.digest,
            worker: found.worker,
            workers,
            attempts,
            elapsed,
        };
        tracing::debug!(
            worker = solution.worker,
            attempts,
            ?elapsed,
            hash_rate = solution.hash_rate(),
            digest = %hex::encode(solution.digest),
            "proof-of-work solved"
        );
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pow::verify;

    #[test]
    fn test_zero_difficulty_returns_immediately() {
        let solver = PowSolver::new().workers(4).required_zero_bytes(0);
        let solution = solver.solve(b"prefix", b"suffix").unwrap();

        assert_eq!(solution.nonce.len(), NONCE_LEN);
        assert_eq!(solution.message.len(), 6 + NONCE_LEN + 6);
        // The winner stops on its first hash; peers may squeeze in one each
        assert!(solution.attempts >= 1);
        assert!(solution.attempts <= 4);
    }

    #[test]
    fn test_solution_layout() {
        let prefix = [0xAAu8; 12];
        let suffix = b"user@example.com\r\nAda\r\nLovelace";
        let solver = PowSolver::new().workers(2).required_zero_bytes(1);
        let solution = solver.solve(&prefix, suffix).unwrap();

        assert_eq!(&solution.message[..12], &prefix);
        assert_eq!(&solution.message[12..20], solution.nonce.as_slice());
        assert_eq!(&solution.message[20..], suffix);
    }

    #[test]
    fn test_solution_satisfies_difficulty() {
        for k in [1usize, 2] {
            let solver = PowSolver::new().workers(default_workers()).required_zero_bytes(k);
            let solution = solver.solve(b"challenge", b"identity").unwrap();

            assert!(solution.digest[..k].iter().all(|&b| b == 0));
            assert_eq!(solution.digest, crate::pow::sha256(&solution.message));
            assert!(verify(&solution.message, k));
        }
    }

    #[test]
    fn test_custom_nonce_width() {
        let solver = PowSolver::new().workers(2).nonce_width(4).required_zero_bytes(1);
        let solution = solver.solve(b"ab", b"cd").unwrap();
        assert_eq!(solution.nonce.len(), 4);
        assert_eq!(solution.message.len(), 8);
    }

    #[test]
    fn test_all_workers_joined_on_success() {
        let probe = WorkerProbe::default();
        let solver = PowSolver::new().workers(4).required_zero_bytes(2);
        let solution = solver
            .search(b"prefix", b"suffix", &CancelToken::new(), Some(&probe))
            .unwrap();

        assert_eq!(solution.workers, 4);
        assert!(solution.worker < 4);
        assert_eq!(probe.started.load(Ordering::Acquire), 4);
        assert_eq!(probe.live.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_cancel_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let solver = PowSolver::new().workers(3).required_zero_bytes(32);
        let err = solver.solve_with_cancel(b"p", b"s", &cancel).unwrap_err();
        assert!(matches!(err, PowError::Cancelled));
    }

    #[test]
    fn test_cancel_during_search_joins_workers() {
        let probe = Arc::new(WorkerProbe::default());
        let cancel = CancelToken::new();

        let handle = {
            let probe = Arc::clone(&probe);
            let cancel = cancel.clone();
            thread::spawn(move || {
                // 32 zero bytes is never found in practice
                PowSolver::new()
                    .workers(3)
                    .required_zero_bytes(32)
                    .search(b"p", b"s", &cancel, Some(&*probe))
            })
        };

        while probe.started.load(Ordering::Acquire) < 3 {
            thread::yield_now();
        }
        cancel.cancel();

        let result = handle.join().unwrap();
        assert!(matches!(result, Err(PowError::Cancelled)));
        assert_eq!(probe.live.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_invalid_config() {
        let err = PowSolver::new().workers(0).solve(b"", b"").unwrap_err();
        assert!(matches!(err, PowError::InvalidConfig(_)));

        let err = PowSolver::new().nonce_width(0).solve(b"", b"").unwrap_err();
        assert!(matches!(err, PowError::InvalidConfig(_)));

        let err = PowSolver::new().required_zero_bytes(33).solve(b"", b"").unwrap_err();
        assert!(matches!(err, PowError::InvalidConfig(_)));
    }

    #[test]
    fn test_default_config() {
        let config = SolverConfig::default();
        assert_eq!(config.nonce_width, 8);
        assert_eq!(config.required_zero_bytes, 4);
        assert!(config.workers >= 1);
        assert!(config.validate().is_ok());
    }
}
