//! Session configuration.

/// Configuration for the session authority.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// HMAC secret for signing credentials.
    pub secret: Vec<u8>,

    /// Access credential lifetime in seconds.
    pub access_ttl_secs: i64,

    /// Refresh credential lifetime in seconds.
    pub refresh_ttl_secs: i64,
}

impl SessionConfig {
    /// Default lifetimes: 15-minute access, 7-day refresh.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_secs: 15 * 60,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}
