//! Session authority for CipherDrop.
//!
//! Owns user identities and the two credential kinds that gate every other
//! server-side call:
//!
//! - a short-lived signed **access credential** (HS256 JWT embedding id,
//!   email, and display name), checked per request by signature and expiry
//!   only — its 15-minute lifetime bounds the blast radius of a leak;
//! - a long-lived **refresh credential**, persisted server-side and rotated
//!   on every use. Presenting an already-rotated credential is treated as a
//!   replay: the whole session is invalidated and the user must log in
//!   again.
//!
//! The transport layer carries the refresh credential in an http-only,
//! same-site cookie scoped to the API root; that layer is out of scope here.

mod authority;
mod config;
mod error;
mod types;

pub use authority::SessionAuthority;
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use types::{AccessClaims, AuthResponse, UserIdentity};
