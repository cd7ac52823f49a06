//! Enroll Client - command-line entry point.
//!
//! Connects to the enrollment service, solves the proof of work and reports
//! the assigned team number.
//!
//! Every flag can also be given through its `ENROLL_*` environment variable.
//! Log output is controlled by `RUST_LOG` (default `info`).
//!
//! Arguments, identity and client settings are all validated before any
//! network activity. Exit status: 0 on success, 1 on a rejected or failed
//! enrollment, 2 on invalid arguments (with usage text).

use std::process::ExitCode;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use enroll_client::client::{
    EnrollClient, EnrollClientBuilder, EnrollError, EnrollmentOutcome, Identity,
};
use enroll_client::core::{
    DEFAULT_PROJECT_CHOICE, DEFAULT_REMOTE_ADDR, DEFAULT_REMOTE_PORT, DEFAULT_TEAM_NUMBER,
    REQUIRED_ZERO_BYTES,
};
use tracing_subscriber::EnvFilter;

/// Enroll with the registration service
#[derive(Parser, Debug)]
#[command(name = "enroll-client", version, about)]
struct Cli {
    /// Remote host that the client connects to
    #[arg(
        long = "remoteAddr",
        env = "ENROLL_REMOTE_ADDR",
        default_value = DEFAULT_REMOTE_ADDR,
        value_parser = parse_remote_addr
    )]
    remote_addr: String,

    /// Remote port that the client connects to
    #[arg(long = "remotePort", env = "ENROLL_REMOTE_PORT", default_value_t = DEFAULT_REMOTE_PORT)]
    remote_port: u16,

    /// Email address to enroll with
    #[arg(long, env = "ENROLL_EMAIL")]
    email: String,

    /// First name
    #[arg(long = "firstName", env = "ENROLL_FIRST_NAME", default_value = "")]
    first_name: String,

    /// Last name
    #[arg(long = "lastName", env = "ENROLL_LAST_NAME", default_value = "")]
    last_name: String,

    /// Requested team number (0 lets the service assign one)
    #[arg(long = "teamNumber", env = "ENROLL_TEAM_NUMBER", default_value_t = DEFAULT_TEAM_NUMBER)]
    team_number: u16,

    /// Project choice
    #[arg(long = "projectChoice", env = "ENROLL_PROJECT_CHOICE", default_value_t = DEFAULT_PROJECT_CHOICE)]
    project_choice: u16,

    /// Proof-of-work threads (defaults to available parallelism)
    #[arg(long, env = "ENROLL_WORKERS", value_parser = clap::value_parser!(u32).range(1..))]
    workers: Option<u32>,

    /// Leading zero bytes required in the proof-of-work digest
    #[arg(long, env = "ENROLL_DIFFICULTY", default_value_t = REQUIRED_ZERO_BYTES as u8,
          value_parser = clap::value_parser!(u8).range(0..=32))]
    difficulty: u8,

    /// Give up after this many seconds per network operation
    #[arg(long, env = "ENROLL_TIMEOUT")]
    timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let client = match build_client(cli) {
        Ok(client) => client,
        Err(e) => Cli::command().error(ErrorKind::ValueValidation, e).exit(),
    };
    tracing::info!(
        remote = %client.config().remote_addr,
        port = client.config().remote_port,
        "starting enrollment"
    );

    match client.enroll().await {
        Ok(EnrollmentOutcome::Success { team_number }) => {
            println!("Enrollment succeeded. Team number: {team_number}");
            ExitCode::SUCCESS
        }
        Ok(EnrollmentOutcome::Failure(reason)) => {
            eprintln!("Enrollment failed: {reason}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Trimmed, non-empty host name.
fn parse_remote_addr(value: &str) -> Result<String, String> {
    let addr = value.trim();
    if addr.is_empty() {
        return Err("remote address must not be empty".into());
    }
    Ok(addr.to_string())
}

fn build_client(cli: Cli) -> Result<EnrollClient, EnrollError> {
    let identity = Identity::new(cli.email, cli.first_name, cli.last_name)?;

    let mut builder = EnrollClientBuilder::new()
        .remote_addr(cli.remote_addr)
        .remote_port(cli.remote_port)
        .identity(identity)
        .team_number(cli.team_number)
        .project_choice(cli.project_choice)
        .required_zero_bytes(cli.difficulty as usize);

    if let Some(workers) = cli.workers {
        builder = builder.workers(workers as usize);
    }
    if let Some(secs) = cli.timeout {
        let limit = Duration::from_secs(secs);
        builder = builder.connect_timeout(Some(limit)).io_timeout(limit);
    }

    builder.build()
}
