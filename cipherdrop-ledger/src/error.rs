//! Ledger error types.
//!
//! Transport status codes are produced only by [`LedgerError::http_status`]
//! at the boundary.

use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur in access ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Caller is neither the owner nor a grant holder.
    #[error("access denied")]
    AccessDenied,

    #[error("recipient not found: {0}")]
    RecipientNotFound(String),

    /// Sharing requires the recipient to have registered a public key —
    /// there is nothing to wrap the content key under otherwise.
    #[error("recipient has no registered public key")]
    RecipientMissingKey,

    #[error("cannot share a file with yourself")]
    SelfShare,

    /// No silent overwrite: re-sharing requires an explicit revoke first.
    #[error("file already shared with this user")]
    AlreadyShared,

    #[error("no grant exists for this file and user")]
    GrantNotFound,

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: u64, max: u64 },

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("blob error: {0}")]
    Blob(#[from] cipherdrop_blobstore::BlobStoreError),

    #[error("storage error: {0}")]
    Storage(#[from] duckdb::Error),

    #[error("upload read error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Boundary mapping for the HTTP layer.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::FileNotFound(_) | Self::RecipientNotFound(_) | Self::GrantNotFound => 404,
            Self::AccessDenied => 403,
            Self::AlreadyShared => 409,
            Self::RecipientMissingKey | Self::SelfShare | Self::InvalidEnvelope(_) => 400,
            Self::PayloadTooLarge { .. } => 413,
            Self::UnsupportedType(_) => 415,
            Self::Blob(_) | Self::Storage(_) | Self::Io(_) => 500,
        }
    }
}
