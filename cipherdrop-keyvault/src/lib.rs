//! Private-key custody for CipherDrop.
//!
//! A user's RSA private key never leaves the client unencrypted. At rest it
//! lives in an [`EncryptedKeyBundle`] — the PKCS#8 export encrypted under an
//! Argon2id-derived key — in a local [`BundleStore`] keyed by email, which is
//! never synced to the server. For the duration of a session the unlocked key
//! occupies the single activated slot of the [`KeyVault`].
//!
//! Failure to deactivate on logout is a residual-memory risk, not a
//! correctness bug: nothing else reads the slot once the session ends.

mod bundle;
mod error;
mod store;
mod vault;

pub use bundle::{protect, unlock, EncryptedKeyBundle};
pub use error::{VaultError, VaultResult};
pub use store::BundleStore;
pub use vault::{ActivatedKey, KeyVault};
