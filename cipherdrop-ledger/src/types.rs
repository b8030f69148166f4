//! Ledger record types.

use chrono::{DateTime, Utc};
use cipherdrop_envelope::EnvelopeMeta;
use serde::Serialize;

/// A stored file's full envelope record.
#[derive(Clone, Debug, Serialize)]
pub struct FileRecord {
    pub id: String,
    pub owner_id: i64,
    pub filename: String,
    pub original_size: u64,
    pub mime_type: Option<String>,
    /// Opaque blob store reference; never exposed to clients.
    #[serde(skip)]
    pub storage_ref: String,
    /// AEAD nonce, base64.
    pub iv: String,
    /// hex(SHA-256(ciphertext)).
    pub integrity_hash: String,
    /// Content key wrapped under the owner's public key, base64.
    pub encrypted_key_for_owner: String,
    pub created_at: DateTime<Utc>,
}

/// A file as listed to its owner.
#[derive(Clone, Debug, Serialize)]
pub struct OwnedFile {
    pub id: String,
    pub filename: String,
    pub original_size: u64,
    pub mime_type: Option<String>,
    pub integrity_hash: String,
    /// Included so the owner can reshare without a second round trip.
    pub encrypted_key_for_owner: String,
    pub created_at: DateTime<Utc>,
}

/// A file as listed to a grant recipient.
#[derive(Clone, Debug, Serialize)]
pub struct SharedFile {
    pub id: String,
    pub filename: String,
    pub original_size: u64,
    pub mime_type: Option<String>,
    pub integrity_hash: String,
    pub encrypted_key_for_recipient: String,
    pub shared_by_email: String,
    pub shared_by_name: String,
    pub shared_at: DateTime<Utc>,
}

/// Access-checked metadata for a single file.
#[derive(Clone, Debug, Serialize)]
pub struct FileMetadata {
    pub id: String,
    pub filename: String,
    pub original_size: u64,
    pub mime_type: Option<String>,
    pub integrity_hash: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A download: ciphertext plus the envelope addressed to the caller.
#[derive(Clone, Debug)]
pub struct Download {
    pub ciphertext: Vec<u8>,
    pub meta: EnvelopeMeta,
}
