//! Session types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user, as exposed to callers (never includes the password
/// hash).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Base64 SPKI public key; `None` until key setup. Set exactly once.
    pub public_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Claims embedded in a signed access credential.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub exp: i64,
}

/// The result of a successful register / login / refresh.
#[derive(Clone, Debug)]
pub struct AuthResponse {
    pub access_credential: String,
    pub refresh_credential: String,
    pub user: UserIdentity,
}
