//! Protocol constants for the enrollment exchange.
//!
//! Message type codes and payload sizes are fixed by the remote service and
//! MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// MESSAGE TYPES
// =============================================================================

/// Server -> client: carries the 8-byte challenge.
pub const MSG_ENROLL_INIT: u16 = 680;

/// Client -> server: registration request with proof-of-work nonce.
pub const MSG_ENROLL_REGISTER: u16 = 681;

/// Server -> client: registration accepted.
pub const MSG_ENROLL_SUCCESS: u16 = 682;

/// Server -> client: registration rejected.
pub const MSG_ENROLL_FAILURE: u16 = 683;

// =============================================================================
// FRAME SIZES
// =============================================================================

/// Size of the `totalSize` field.
pub const FRAME_SIZE_FIELD_LEN: usize = 2;

/// Size of the `msgType` field.
pub const FRAME_TYPE_FIELD_LEN: usize = 2;

/// Frame header size (size + type).
pub const FRAME_HEADER_LEN: usize = FRAME_SIZE_FIELD_LEN + FRAME_TYPE_FIELD_LEN;

/// Largest encodable frame, bounded by the u16 size field.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

/// Largest payload that still fits a frame.
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - FRAME_HEADER_LEN;

// =============================================================================
// MESSAGE BODIES
// =============================================================================

/// Challenge size in the Init payload.
pub const CHALLENGE_LEN: usize = 8;

/// Success payload size (reserved + team number).
pub const SUCCESS_PAYLOAD_LEN: usize = 4;

/// Minimum Failure payload size (reserved + error code).
pub const FAILURE_PAYLOAD_MIN_LEN: usize = 4;

/// Register prefix size (challenge + team number + project choice).
pub const REGISTER_PREFIX_LEN: usize = CHALLENGE_LEN + 2 + 2;

/// Separator between identity fields.
pub const IDENTITY_SEPARATOR: &str = "\r\n";

// =============================================================================
// PROOF OF WORK
// =============================================================================

/// Width of the nonce placed between prefix and identity.
pub const NONCE_LEN: usize = 8;

/// Leading zero bytes the service requires in the SHA-256 digest.
pub const REQUIRED_ZERO_BYTES: usize = 4;

/// SHA-256 digest size.
pub const DIGEST_LEN: usize = 32;

// =============================================================================
// DEFAULTS
// =============================================================================

/// Default enrollment service host.
pub const DEFAULT_REMOTE_ADDR: &str = "fulcrum.net.in.tum.de";

/// Default enrollment service port.
pub const DEFAULT_REMOTE_PORT: u16 = 34151;

/// Default project choice sent in the Register message.
pub const DEFAULT_PROJECT_CHOICE: u16 = 7071;

/// Default team number (0 asks the service to assign one).
pub const DEFAULT_TEAM_NUMBER: u16 = 0;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
