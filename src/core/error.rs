//! Error types for the enrollment protocol.

use std::fmt;

use thiserror::Error;

use super::types::MsgType;

/// Size a payload was required to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedSize {
    /// Exactly this many bytes.
    Exactly(usize),
    /// This many bytes or more.
    AtLeast(usize),
}

impl ExpectedSize {
    /// Check whether `len` satisfies the requirement.
    pub fn accepts(self, len: usize) -> bool {
        match self {
            Self::Exactly(n) => len == n,
            Self::AtLeast(n) => len >= n,
        }
    }
}

impl fmt::Display for ExpectedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "{n}"),
            Self::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Violations of the enrollment exchange detected by the client.
///
/// These are reported as a failed outcome, not as a fatal error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The peer sent a message type that is not valid in the current state.
    #[error("expected {} but received a message of type {actual}", format_expected(.expected))]
    UnexpectedMessageType {
        /// Message types accepted in this state.
        expected: &'static [MsgType],
        /// Wire value received.
        actual: u16,
    },

    /// A payload had the wrong length for its message type.
    #[error("{context} payload has {actual} bytes, expected {expected}")]
    SizeMismatch {
        /// Message the payload belongs to.
        context: MsgType,
        /// Required size.
        expected: ExpectedSize,
        /// Received size.
        actual: usize,
    },

    /// Frame length field too small to hold a message type.
    #[error("malformed frame: total size {total_size}")]
    MalformedFrame {
        /// Value of the size field.
        total_size: u16,
    },
}

fn format_expected(expected: &[MsgType]) -> String {
    expected
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Invalid configuration, detected before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Remote address is empty.
    #[error("remote address is empty")]
    EmptyRemoteAddr,

    /// No identity was supplied.
    #[error("identity (email, first name, last name) is required")]
    MissingIdentity,

    /// Identity field cannot be encoded.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Solver parameters are out of range.
    #[error("invalid solver configuration: {0}")]
    InvalidSolver(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_size_accepts() {
        assert!(ExpectedSize::Exactly(8).accepts(8));
        assert!(!ExpectedSize::Exactly(8).accepts(6));
        assert!(!ExpectedSize::Exactly(8).accepts(9));

        assert!(ExpectedSize::AtLeast(4).accepts(4));
        assert!(ExpectedSize::AtLeast(4).accepts(100));
        assert!(!ExpectedSize::AtLeast(4).accepts(3));
    }

    #[test]
    fn test_protocol_error_messages() {
        let err = ProtocolError::UnexpectedMessageType {
            expected: &[MsgType::Success, MsgType::Failure],
            actual: 680,
        };
        assert_eq!(
            err.to_string(),
            "expected ENROLL SUCCESS (682) or ENROLL FAILURE (683) but received a message of type 680"
        );

        let err = ProtocolError::SizeMismatch {
            context: MsgType::Init,
            expected: ExpectedSize::Exactly(8),
            actual: 6,
        };
        assert_eq!(err.to_string(), "ENROLL INIT (680) payload has 6 bytes, expected 8");

        let err = ProtocolError::SizeMismatch {
            context: MsgType::Failure,
            expected: ExpectedSize::AtLeast(4),
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "ENROLL FAILURE (683) payload has 2 bytes, expected at least 4"
        );
    }
}
