//! Envelope error types.

use thiserror::Error;

/// Result type for envelope operations.
pub type EnvelopeResult<T> = Result<T, EnvelopeError>;

/// Errors that can occur sealing or opening envelopes.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The ciphertext hash or AEAD tag check failed: storage or transport
    /// corruption. The envelope is discarded; no partial plaintext is ever
    /// surfaced.
    #[error("integrity check failed: ciphertext does not match its recorded hash")]
    IntegrityMismatch,

    /// The content key could not be unwrapped with the caller's private key:
    /// it was wrapped for a different keypair. Distinct from
    /// [`IntegrityMismatch`] — the envelope itself is intact.
    #[error("content key was wrapped for a different keypair")]
    KeyMismatch,

    #[error("invalid envelope encoding: {0}")]
    Encoding(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] cipherdrop_crypto::CryptoError),

    #[error("background task failed: {0}")]
    TaskJoin(String),
}
