//! Protocol value types shared by every layer.

use std::fmt;

use super::constants::{
    CHALLENGE_LEN, MSG_ENROLL_FAILURE, MSG_ENROLL_INIT, MSG_ENROLL_REGISTER, MSG_ENROLL_SUCCESS,
};

/// Enrollment message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MsgType {
    /// Challenge issued by the server.
    Init = MSG_ENROLL_INIT,
    /// Registration request from the client.
    Register = MSG_ENROLL_REGISTER,
    /// Registration accepted.
    Success = MSG_ENROLL_SUCCESS,
    /// Registration rejected.
    Failure = MSG_ENROLL_FAILURE,
}

impl MsgType {
    /// Parse a message type from its wire value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            MSG_ENROLL_INIT => Some(Self::Init),
            MSG_ENROLL_REGISTER => Some(Self::Register),
            MSG_ENROLL_SUCCESS => Some(Self::Success),
            MSG_ENROLL_FAILURE => Some(Self::Failure),
            _ => None,
        }
    }

    /// Wire value of this message type.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Init => "ENROLL INIT",
            Self::Register => "ENROLL REGISTER",
            Self::Success => "ENROLL SUCCESS",
            Self::Failure => "ENROLL FAILURE",
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u16())
    }
}

/// Server-issued challenge (8 bytes).
///
/// Bound into the proof-of-work input so a solution cannot be precomputed or
/// replayed against another session.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Challenge([u8; CHALLENGE_LEN]);

impl Challenge {
    /// Create a challenge from raw bytes.
    pub fn from_bytes(bytes: [u8; CHALLENGE_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a challenge from a slice, if it has the right length.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; CHALLENGE_LEN] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Get the challenge bytes.
    pub fn as_bytes(&self) -> &[u8; CHALLENGE_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for Challenge {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Challenge({})", hex::encode(self.0))
    }
}
