//! Enrollment session state machine.
//!
//! ```text
//!  AwaitInit ──Init──▶ AwaitRegisterResult ──Success──▶ Success
//!      │                  │  (send Register)  ──Failure──▶ Failure
//!      └── bad type/size ─┴── bad type/size ────────────▶ Failure
//! ```
//!
//! Every non-terminal step performs at most one frame read or write. No
//! state is re-entered. The challenge lives in the session only until the
//! Register frame has been built.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use super::identity::Identity;
use crate::core::{
    CHALLENGE_LEN, Challenge, ConfigError, DEFAULT_PROJECT_CHOICE, DEFAULT_TEAM_NUMBER,
    ExpectedSize, FAILURE_PAYLOAD_MIN_LEN, FRAME_HEADER_LEN, MAX_FRAME_LEN, MsgType,
    ProtocolError, REGISTER_PREFIX_LEN, SUCCESS_PAYLOAD_LEN,
};
use crate::pow::{CancelToken, PowError, PowSolver, Solution, SolverConfig};
use crate::transport::{
    Frame, FrameError, TransportError, TransportResult, read_frame, write_frame,
};

/// Errors that abort a session.
///
/// Protocol violations are not errors; they end in [`SessionState::Failure`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// Stream failed, closed early or timed out.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Proof-of-work search failed.
    #[error("proof-of-work error: {0}")]
    Pow(#[from] PowError),

    /// Proof-of-work search exceeded its deadline.
    #[error("proof-of-work not found within {0:?}")]
    SolveTimeout(Duration),

    /// Blocking solver task could not be joined.
    #[error("solver task failed: {0}")]
    Join(String),
}

/// Why a session ended in failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Server answered with ENROLL FAILURE.
    Rejected {
        /// Server error code.
        error_code: u16,
        /// Server description.
        description: String,
    },
    /// Client detected a protocol violation.
    Protocol(ProtocolError),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected {
                error_code,
                description,
            } => write!(f, "rejected by server (code {error_code}): {description}"),
            Self::Protocol(e) => write!(f, "protocol violation: {e}"),
        }
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the server's Init frame.
    AwaitInit,
    /// Challenge received; Register is sent next, then the result is awaited.
    AwaitRegisterResult,
    /// Enrollment accepted (terminal).
    Success {
        /// Team number assigned by the server.
        team_number: u16,
    },
    /// Enrollment failed (terminal).
    Failure(FailureReason),
}

impl SessionState {
    /// Check whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Failure(_))
    }
}

/// Final result of an enrollment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    /// Enrollment accepted.
    Success {
        /// Team number assigned by the server.
        team_number: u16,
    },
    /// Enrollment rejected or aborted by a protocol violation.
    Failure(FailureReason),
}

impl EnrollmentOutcome {
    /// Check whether the enrollment succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Per-session parameters.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Enrollee identity.
    pub identity: Identity,
    /// Requested team number.
    pub team_number: u16,
    /// Project choice.
    pub project_choice: u16,
    /// Proof-of-work parameters.
    pub solver: SolverConfig,
    /// Limit for each frame read or write.
    pub io_timeout: Option<Duration>,
    /// Limit for the proof-of-work search.
    pub solve_timeout: Option<Duration>,
}

impl SessionConfig {
    /// Create a configuration with protocol defaults.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            team_number: DEFAULT_TEAM_NUMBER,
            project_choice: DEFAULT_PROJECT_CHOICE,
            solver: SolverConfig::default(),
            io_timeout: None,
            solve_timeout: None,
        }
    }

    /// Set the team number.
    pub fn team_number(mut self, team_number: u16) -> Self {
        self.team_number = team_number;
        self
    }

    /// Set the project choice.
    pub fn project_choice(mut self, project_choice: u16) -> Self {
        self.project_choice = project_choice;
        self
    }

    /// Set the solver parameters.
    pub fn solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Set the per-frame I/O timeout.
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }

    /// Set the proof-of-work deadline.
    pub fn solve_timeout(mut self, timeout: Duration) -> Self {
        self.solve_timeout = Some(timeout);
        self
    }

    /// Check the configuration before any network activity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.solver
            .validate()
            .map_err(|e| ConfigError::InvalidSolver(e.to_string()))?;

        let size = register_frame_len(self.solver.nonce_width, self.identity.payload().len());
        if size > MAX_FRAME_LEN {
            return Err(ConfigError::InvalidIdentity(format!(
                "register frame would be {size} bytes, limit is {MAX_FRAME_LEN}"
            )));
        }
        Ok(())
    }
}

/// Size of the Register frame for a given nonce width and identity length.
fn register_frame_len(nonce_width: usize, identity_len: usize) -> usize {
    FRAME_HEADER_LEN + REGISTER_PREFIX_LEN + nonce_width + identity_len
}

/// Validate an Init frame and extract its challenge.
pub fn on_init(frame: &Frame) -> Result<Challenge, ProtocolError> {
    if frame.kind() != Some(MsgType::Init) {
        return Err(ProtocolError::UnexpectedMessageType {
            expected: &[MsgType::Init],
            actual: frame.msg_type,
        });
    }

    Challenge::from_slice(&frame.payload).ok_or(ProtocolError::SizeMismatch {
        context: MsgType::Init,
        expected: ExpectedSize::Exactly(CHALLENGE_LEN),
        actual: frame.payload.len(),
    })
}

/// Map the server's answer to a Register frame onto a terminal state.
pub fn on_register_result(frame: &Frame) -> SessionState {
    let payload = &frame.payload;
    match frame.kind() {
        Some(MsgType::Success) => {
            let expected = ExpectedSize::Exactly(SUCCESS_PAYLOAD_LEN);
            if !expected.accepts(payload.len()) {
                return protocol_failure(ProtocolError::SizeMismatch {
                    context: MsgType::Success,
                    expected,
                    actual: payload.len(),
                });
            }
            // Bytes 0..2 are reserved
            SessionState::Success {
                team_number: u16::from_be_bytes([payload[2], payload[3]]),
            }
        }
        Some(MsgType::Failure) => {
            let expected = ExpectedSize::AtLeast(FAILURE_PAYLOAD_MIN_LEN);
            if !expected.accepts(payload.len()) {
                return protocol_failure(ProtocolError::SizeMismatch {
                    context: MsgType::Failure,
                    expected,
                    actual: payload.len(),
                });
            }
            SessionState::Failure(FailureReason::Rejected {
                error_code: u16::from_be_bytes([payload[2], payload[3]]),
                description: String::from_utf8_lossy(&payload[FAILURE_PAYLOAD_MIN_LEN..])
                    .into_owned(),
            })
        }
        _ => protocol_failure(ProtocolError::UnexpectedMessageType {
            expected: &[MsgType::Success, MsgType::Failure],
            actual: frame.msg_type,
        }),
    }
}

/// `challenge ‖ team_number ‖ project_choice`, the fixed part before the nonce.
pub fn register_prefix(
    challenge: &Challenge,
    team_number: u16,
    project_choice: u16,
) -> [u8; REGISTER_PREFIX_LEN] {
    let mut prefix = [0u8; REGISTER_PREFIX_LEN];
    prefix[..CHALLENGE_LEN].copy_from_slice(challenge.as_bytes());
    prefix[CHALLENGE_LEN..CHALLENGE_LEN + 2].copy_from_slice(&team_number.to_be_bytes());
    prefix[CHALLENGE_LEN + 2..].copy_from_slice(&project_choice.to_be_bytes());
    prefix
}

/// Run one enrollment over a caller-supplied stream.
///
/// The stream is dropped on return. Use [`Session`] directly to get it back.
pub async fn run_session<S>(
    stream: S,
    config: SessionConfig,
) -> Result<EnrollmentOutcome, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut session = Session::new(stream, config);
    session.run().await
}

fn protocol_failure(error: ProtocolError) -> SessionState {
    SessionState::Failure(FailureReason::Protocol(error))
}

async fn with_timeout<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = TransportResult<T>>,
) -> TransportResult<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| TransportError::Timeout)?,
        None => fut.await,
    }
}

/// One enrollment exchange over an exclusively owned stream.
///
/// # Example
///
/// ```ignore
/// let identity = Identity::new("ada@example.com", "Ada", "Lovelace")?;
/// let mut session = Session::new(stream, SessionConfig::new(identity));
/// match session.run().await? {
///     EnrollmentOutcome::Success { team_number } => println!("team {team_number}"),
///     EnrollmentOutcome::Failure(reason) => eprintln!("{reason}"),
/// }
/// ```
#[derive(Debug)]
pub struct Session<S> {
    stream: S,
    config: SessionConfig,
    state: SessionState,
    /// Held between Init and the Register write.
    challenge: Option<Challenge>,
    cancel: CancelToken,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a session in [`SessionState::AwaitInit`].
    pub fn new(stream: S, config: SessionConfig) -> Self {
        Self {
            stream,
            config,
            state: SessionState::AwaitInit,
            challenge: None,
            cancel: CancelToken::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Challenge waiting to be used for the Register frame.
    pub fn pending_challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref()
    }

    /// Token that aborts a running proof-of-work search.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Give back the stream, e.g. to close it.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Drive the session until it reaches a terminal state.
    pub async fn run(&mut self) -> Result<EnrollmentOutcome, SessionError> {
        loop {
            match self.step().await? {
                SessionState::Success { team_number } => {
                    return Ok(EnrollmentOutcome::Success {
                        team_number: *team_number,
                    });
                }
                SessionState::Failure(reason) => {
                    return Ok(EnrollmentOutcome::Failure(reason.clone()));
                }
                _ => {}
            }
        }
    }

    /// Perform one transition.
    ///
    /// Terminal states are left unchanged and perform no I/O.
    pub async fn step(&mut self) -> Result<&SessionState, SessionError> {
        match self.state {
            SessionState::AwaitInit => {
                let next = match self.receive().await? {
                    Ok(frame) => match on_init(&frame) {
                        Ok(challenge) => {
                            tracing::info!("received enrollment init");
                            tracing::debug!(challenge = %hex::encode(challenge), "challenge");
                            self.challenge = Some(challenge);
                            SessionState::AwaitRegisterResult
                        }
                        Err(e) => protocol_failure(e),
                    },
                    Err(e) => protocol_failure(e),
                };
                self.transition(next);
            }
            SessionState::AwaitRegisterResult => {
                if let Some(challenge) = self.challenge.take() {
                    self.send_register(challenge).await?;
                } else {
                    let next = match self.receive().await? {
                        Ok(frame) => on_register_result(&frame),
                        Err(e) => protocol_failure(e),
                    };
                    self.transition(next);
                }
            }
            SessionState::Success { .. } | SessionState::Failure(_) => {}
        }
        Ok(&self.state)
    }

    fn transition(&mut self, next: SessionState) {
        match &next {
            SessionState::Success { team_number } => {
                tracing::info!(team_number, "enrollment succeeded");
            }
            SessionState::Failure(reason) => {
                tracing::warn!(%reason, "enrollment failed");
            }
            _ => tracing::debug!(from = ?self.state, to = ?next, "session transition"),
        }
        self.state = next;
    }

    /// Read one frame; a malformed size field is a protocol violation.
    async fn receive(&mut self) -> Result<Result<Frame, ProtocolError>, SessionError> {
        match with_timeout(self.config.io_timeout, read_frame(&mut self.stream)).await {
            Ok(frame) => Ok(Ok(frame)),
            Err(TransportError::Frame(FrameError::Malformed { total_size })) => {
                Ok(Err(ProtocolError::MalformedFrame { total_size }))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn send_register(&mut self, challenge: Challenge) -> Result<(), SessionError> {
        let prefix = register_prefix(
            &challenge,
            self.config.team_number,
            self.config.project_choice,
        );
        let suffix = self.config.identity.payload();

        // Refuse before burning CPU on a frame that cannot be sent
        let size = register_frame_len(self.config.solver.nonce_width, suffix.len());
        if size > MAX_FRAME_LEN {
            return Err(TransportError::from(FrameError::TooLarge { size }).into());
        }

        tracing::info!(
            workers = self.config.solver.workers,
            required_zero_bytes = self.config.solver.required_zero_bytes,
            "solving proof of work"
        );
        let solution = self.solve(prefix.to_vec(), suffix).await?;
        tracing::info!(
            attempts = solution.attempts,
            elapsed = ?solution.elapsed,
            hash_rate = solution.hash_rate(),
            "proof of work found"
        );

        let written = with_timeout(
            self.config.io_timeout,
            write_frame(&mut self.stream, MsgType::Register, &solution.message),
        )
        .await?;
        tracing::info!(bytes = written, "sent enrollment register");
        Ok(())
    }

    /// Run the solver on a blocking thread, honoring the solve deadline.
    async fn solve(&self, prefix: Vec<u8>, suffix: Vec<u8>) -> Result<Solution, SessionError> {
        let solver = PowSolver::with_config(self.config.solver.clone());
        let cancel = self.cancel.clone();
        let mut task =
            tokio::task::spawn_blocking(move || solver.solve_with_cancel(&prefix, &suffix, &cancel));

        // Dropping this future mid-search must still stop the workers
        let guard = self.cancel.drop_guard();
        let joined = match self.config.solve_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    self.cancel.cancel();
                    // Workers exit on their next attempt; wait for the join
                    let _ = task.await;
                    return Err(SessionError::SolveTimeout(limit));
                }
            },
            None => task.await,
        };
        guard.disarm();

        let solution = joined.map_err(|e| SessionError::Join(e.to_string()))??;
        Ok(solution)
    }
}
