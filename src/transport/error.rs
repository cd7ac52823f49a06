//! Transport layer error types.
//!
//! Transport errors end the session. They are never retried.

use std::io;

use thiserror::Error;

use super::frame::FrameError;

/// Transport layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Framing error (truncated, malformed or oversized frame).
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// I/O error (socket operations).
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Host name did not resolve to any address.
    #[error("could not resolve {host}")]
    Resolve {
        /// Host that was looked up.
        host: String,
    },

    /// TCP connect did not complete in time.
    #[error("connect timeout")]
    ConnectTimeout,

    /// A frame read or write did not complete in time.
    #[error("i/o timeout")]
    Timeout,
}

impl TransportError {
    /// Check if the peer closed the stream before a frame was complete.
    pub fn is_truncated(&self) -> bool {
        matches!(self, TransportError::Frame(FrameError::Truncated { .. }))
    }

    /// Check if this error is fatal to the session.
    ///
    /// Only a malformed size field is recoverable as a protocol failure;
    /// everything else aborts.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TransportError::Frame(FrameError::Malformed { .. }))
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_errors() {
        let err = TransportError::from(FrameError::Truncated {
            expected: 2,
            actual: 0,
        });
        assert!(err.is_truncated());
        assert!(err.is_fatal());

        assert!(!TransportError::Timeout.is_truncated());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(TransportError::Timeout.is_fatal());
        assert!(TransportError::ConnectTimeout.is_fatal());
        assert!(TransportError::Io(io::Error::new(io::ErrorKind::Other, "test")).is_fatal());
        assert!(TransportError::Frame(FrameError::TooLarge { size: 70000 }).is_fatal());

        assert!(!TransportError::Frame(FrameError::Malformed { total_size: 1 }).is_fatal());
    }
}
