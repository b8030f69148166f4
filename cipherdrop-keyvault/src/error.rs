//! Key vault error types.

use thiserror::Error;

/// Result type for key vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur in key vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// No bundle stored for this email — keys were never set up (or were reset).
    #[error("no encryption keys found for {0}")]
    NoKeys(String),

    /// Unlock failed. Deliberately does not distinguish a wrong passphrase
    /// from a corrupted bundle.
    #[error("invalid passphrase")]
    InvalidPassphrase,

    #[error("keys already set up for {0}")]
    KeysExist(String),

    #[error("storage error: {0}")]
    Storage(#[from] duckdb::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] cipherdrop_crypto::CryptoError),
}
