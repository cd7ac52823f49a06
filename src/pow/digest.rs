//! Digest helpers for the proof-of-work condition.

use sha2::{Digest, Sha256};

use crate::core::DIGEST_LEN;

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; DIGEST_LEN] {
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

/// Check that the first `count` bytes of `digest` are zero.
///
/// A `count` larger than the digest can never be satisfied.
pub fn has_leading_zero_bytes(digest: &[u8], count: usize) -> bool {
    digest.len() >= count && digest[..count].iter().all(|&b| b == 0)
}

/// Check a complete solved message against the difficulty.
pub fn verify(message: &[u8], required_zero_bytes: usize) -> bool {
    has_leading_zero_bytes(&sha256(message), required_zero_bytes)
}
