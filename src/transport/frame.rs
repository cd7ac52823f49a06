//! Frame encoding and decoding for the enrollment transport.
//!
//! Wire format (all integers big-endian):
//! ```text
//! +------------------+------------------+---------------------------+
//! | Total Size       | Message Type     | Payload                   |
//! | 2 bytes (BE16)   | 2 bytes (BE16)   | total size - 4 bytes      |
//! +------------------+------------------+---------------------------+
//! ```
//!
//! The total size counts the whole frame, including the size field itself.

use thiserror::Error;

use crate::core::{FRAME_HEADER_LEN, FRAME_SIZE_FIELD_LEN, MAX_FRAME_LEN, MsgType};

/// Errors that can occur while framing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Stream or buffer ended before the frame was complete.
    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Size field cannot describe a valid frame.
    #[error("malformed frame: total size {total_size} is smaller than the {}-byte header", FRAME_HEADER_LEN)]
    Malformed {
        /// Value of the size field.
        total_size: u16,
    },

    /// Frame would not fit the 16-bit size field.
    #[error("frame too large: {size} bytes exceeds {}", MAX_FRAME_LEN)]
    TooLarge {
        /// Size the frame would have.
        size: usize,
    },
}

/// One decoded protocol message.
///
/// The message type is kept as its raw wire value so that unknown types can
/// be reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw message type.
    pub msg_type: u16,
    /// Message body.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame for a known message type.
    pub fn new(msg_type: MsgType, payload: Vec<u8>) -> Self {
        Self {
            msg_type: msg_type.as_u16(),
            payload,
        }
    }

    /// Parse the message type, if it is one of the enrollment messages.
    pub fn kind(&self) -> Option<MsgType> {
        MsgType::from_u16(self.msg_type)
    }

    /// Size of this frame on the wire.
    pub fn total_size(&self) -> usize {
        FRAME_HEADER_LEN + self.payload.len()
    }

    /// Serialize this frame.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        encode_frame(self.msg_type, &self.payload)
    }

    /// Parse one frame from the front of `bytes`.
    ///
    /// Returns the frame and the number of bytes consumed.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), FrameError> {
        if bytes.len() < FRAME_SIZE_FIELD_LEN {
            return Err(FrameError::Truncated {
                expected: FRAME_SIZE_FIELD_LEN,
                actual: bytes.len(),
            });
        }

        let remaining = remaining_len([bytes[0], bytes[1]])?;
        let total = FRAME_SIZE_FIELD_LEN + remaining;
        if bytes.len() < total {
            return Err(FrameError::Truncated {
                expected: total,
                actual: bytes.len(),
            });
        }

        let frame = Self::from_body(&bytes[FRAME_SIZE_FIELD_LEN..total])?;
        Ok((frame, total))
    }

    /// Build a frame from the bytes that follow the size field.
    pub(crate) fn from_body(body: &[u8]) -> Result<Self, FrameError> {
        if body.len() < 2 {
            return Err(FrameError::Malformed {
                total_size: (FRAME_SIZE_FIELD_LEN + body.len()) as u16,
            });
        }
        Ok(Self {
            msg_type: u16::from_be_bytes([body[0], body[1]]),
            payload: body[2..].to_vec(),
        })
    }
}

/// Number of bytes that follow a size field.
///
/// A size of 0 or 1 would be negative, 2 or 3 would leave no room for the
/// message type; all four are rejected.
pub fn remaining_len(size_field: [u8; 2]) -> Result<usize, FrameError> {
    let total_size = u16::from_be_bytes(size_field);
    if (total_size as usize) < FRAME_HEADER_LEN {
        return Err(FrameError::Malformed { total_size });
    }
    Ok(total_size as usize - FRAME_SIZE_FIELD_LEN)
}

/// Serialize a frame from a raw message type and payload.
pub fn encode_frame(msg_type: u16, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let size = FRAME_HEADER_LEN + payload.len();
    if size > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge { size });
    }

    let mut buf = Vec::with_capacity(size);
    buf.extend_from_slice(&(size as u16).to_be_bytes());
    buf.extend_from_slice(&msg_type.to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}
