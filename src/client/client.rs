//! High-level enrollment client API.
//!
//! Provides [`EnrollClient`], which connects to the enrollment service, runs
//! one [`Session`] and closes the connection on every path.

use std::time::Duration;

use thiserror::Error;

use super::identity::Identity;
use super::session::{EnrollmentOutcome, Session, SessionConfig, SessionError};
use crate::core::{
    ConfigError, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PROJECT_CHOICE, DEFAULT_REMOTE_ADDR,
    DEFAULT_REMOTE_PORT, DEFAULT_TEAM_NUMBER,
};
use crate::pow::SolverConfig;
use crate::transport::{self, TransportError};

/// Errors that can occur in the enrollment client.
#[derive(Debug, Error)]
pub enum EnrollError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Could not reach the service.
    #[error("connection failed: {0}")]
    Connect(#[from] TransportError),

    /// Session aborted.
    #[error("session aborted: {0}")]
    Session(#[from] SessionError),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct EnrollConfig {
    /// Service host name or IP address.
    pub remote_addr: String,
    /// Service port.
    pub remote_port: u16,
    /// TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Session parameters.
    pub session: SessionConfig,
}

/// Builder for creating an [`EnrollClient`].
#[derive(Debug, Clone)]
pub struct EnrollClientBuilder {
    remote_addr: String,
    remote_port: u16,
    connect_timeout: Option<Duration>,
    identity: Option<Identity>,
    team_number: u16,
    project_choice: u16,
    solver: SolverConfig,
    io_timeout: Option<Duration>,
    solve_timeout: Option<Duration>,
}

impl Default for EnrollClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EnrollClientBuilder {
    /// Create a builder with protocol defaults.
    pub fn new() -> Self {
        Self {
            remote_addr: DEFAULT_REMOTE_ADDR.to_string(),
            remote_port: DEFAULT_REMOTE_PORT,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            identity: None,
            team_number: DEFAULT_TEAM_NUMBER,
            project_choice: DEFAULT_PROJECT_CHOICE,
            solver: SolverConfig::default(),
            io_timeout: None,
            solve_timeout: None,
        }
    }

    /// Set the service host.
    pub fn remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = addr.into();
        self
    }

    /// Set the service port.
    pub fn remote_port(mut self, port: u16) -> Self {
        self.remote_port = port;
        self
    }

    /// Set the connect timeout (`None` waits indefinitely).
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the enrollee identity.
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
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

    /// Set the proof-of-work worker count.
    pub fn workers(mut self, workers: usize) -> Self {
        self.solver.workers = workers;
        self
    }

    /// Set the proof-of-work difficulty.
    pub fn required_zero_bytes(mut self, count: usize) -> Self {
        self.solver.required_zero_bytes = count;
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

    /// Validate and build the client.
    pub fn build(self) -> Result<EnrollClient, EnrollError> {
        if self.remote_addr.trim().is_empty() {
            return Err(ConfigError::EmptyRemoteAddr.into());
        }
        let identity = self.identity.ok_or(ConfigError::MissingIdentity)?;

        let session = SessionConfig {
            identity,
            team_number: self.team_number,
            project_choice: self.project_choice,
            solver: self.solver,
            io_timeout: self.io_timeout,
            solve_timeout: self.solve_timeout,
        };
        session.validate()?;

        Ok(EnrollClient {
            config: EnrollConfig {
                remote_addr: self.remote_addr,
                remote_port: self.remote_port,
                connect_timeout: self.connect_timeout,
                session,
            },
        })
    }
}

/// Enrollment client.
///
/// # Example
///
/// ```ignore
/// use enroll_client::client::{EnrollClientBuilder, Identity};
///
/// let client = EnrollClientBuilder::new()
///     .identity(Identity::new("ada@example.com", "Ada", "Lovelace")?)
///     .team_number(0)
///     .build()?;
///
/// let outcome = client.enroll().await?;
/// ```
#[derive(Debug, Clone)]
pub struct EnrollClient {
    config: EnrollConfig,
}

impl EnrollClient {
    /// Get the configuration.
    pub fn config(&self) -> &EnrollConfig {
        &self.config
    }

    /// Connect, enroll and disconnect.
    ///
    /// A rejected enrollment or protocol violation is an `Ok` outcome; only
    /// configuration, connection and aborted sessions are errors.
    pub async fn enroll(&self) -> Result<EnrollmentOutcome, EnrollError> {
        let stream = transport::connect(
            &self.config.remote_addr,
            self.config.remote_port,
            self.config.connect_timeout,
        )
        .await?;

        let mut session = Session::new(stream, self.config.session.clone());
        let result = session.run().await;

        let mut stream = session.into_inner();
        transport::close(&mut stream).await;

        Ok(result?)
    }
}
