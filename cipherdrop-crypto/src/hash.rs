//! Integrity hashing. SHA-256 only, never used for key material.

use sha2::{Digest, Sha256};

/// SHA-256 of the input as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
