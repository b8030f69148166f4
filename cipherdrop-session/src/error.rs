//! Session error types.
//!
//! Transport status codes are produced only by [`SessionError::http_status`]
//! at the boundary; the variants themselves are the taxonomy.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur in session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Unknown email or wrong password. Deliberately uniform.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("credential expired")]
    CredentialExpired,

    /// Malformed or wrongly signed credential.
    #[error("credential rejected: {0}")]
    CredentialInvalid(String),

    /// A rotated refresh credential was presented again. Possible session
    /// hijack; never retried automatically.
    #[error("refresh credential already rotated")]
    CredentialReplay,

    #[error("user with this email already exists")]
    EmailTaken,

    #[error("public key already in use")]
    PublicKeyTaken,

    /// The public key is registered exactly once and is immutable after.
    #[error("public key already set for this account")]
    PublicKeyAlreadySet,

    #[error("password too short (min 8 characters)")]
    WeakPassword,

    #[error("user not found: {0}")]
    UserNotFound(i64),

    #[error("password hash error: {0}")]
    PasswordHash(String),

    #[error("credential encoding error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("storage error: {0}")]
    Storage(#[from] duckdb::Error),
}

impl SessionError {
    /// Boundary mapping for the HTTP layer.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidCredentials
            | Self::CredentialExpired
            | Self::CredentialInvalid(_)
            | Self::CredentialReplay => 401,
            Self::EmailTaken | Self::PublicKeyTaken | Self::PublicKeyAlreadySet => 409,
            Self::WeakPassword => 400,
            Self::UserNotFound(_) => 404,
            Self::PasswordHash(_) | Self::Token(_) | Self::Storage(_) => 500,
        }
    }
}
