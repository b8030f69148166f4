//! Envelope wire format.
//!
//! The JSON shape exchanged with the server alongside ciphertext bytes:
//! binary fields as base64, the integrity hash as hex.

use crate::engine::SealedFile;
use crate::error::{EnvelopeError, EnvelopeResult};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use cipherdrop_crypto::NONCE_SIZE;
use serde::{Deserialize, Serialize};

/// Per-file envelope metadata.
///
/// On download the server always emits the wrapped key under the
/// `encryptedKeyForOwner` field name, even when the embedded key is a grant
/// recipient's — the alias keeps both spellings parseable.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMeta {
    pub filename: String,
    /// AEAD nonce, base64.
    pub iv: String,
    /// hex(SHA-256(ciphertext)).
    pub integrity_hash: String,
    /// base64(RSA-OAEP(content key)), addressed to exactly one recipient.
    #[serde(rename = "encryptedKeyForOwner", alias = "encryptedKeyForRecipient")]
    pub encrypted_key: String,
    pub original_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl EnvelopeMeta {
    /// Builds upload metadata from a freshly sealed file.
    pub fn for_owner(
        filename: impl Into<String>,
        original_size: u64,
        mime_type: Option<String>,
        sealed: &SealedFile,
    ) -> Self {
        Self {
            filename: filename.into(),
            iv: B64.encode(sealed.nonce),
            integrity_hash: sealed.integrity_hash.clone(),
            encrypted_key: B64.encode(&sealed.wrapped_key_for_owner),
            original_size,
            mime_type,
        }
    }

    /// Returns a copy addressed to a different recipient's wrapped key.
    pub fn with_encrypted_key(&self, wrapped_key: &[u8]) -> Self {
        Self {
            encrypted_key: B64.encode(wrapped_key),
            ..self.clone()
        }
    }

    /// Decodes the base64 nonce, validating its length.
    pub fn nonce_bytes(&self) -> EnvelopeResult<[u8; NONCE_SIZE]> {
        let bytes = B64
            .decode(&self.iv)
            .map_err(|e| EnvelopeError::Encoding(format!("bad iv: {e}")))?;
        bytes.try_into().map_err(|_| {
            EnvelopeError::Encoding(format!("iv must be {NONCE_SIZE} bytes"))
        })
    }

    /// Decodes the base64 wrapped content key.
    pub fn encrypted_key_bytes(&self) -> EnvelopeResult<Vec<u8>> {
        B64.decode(&self.encrypted_key)
            .map_err(|e| EnvelopeError::Encoding(format!("bad encrypted key: {e}")))
    }
}
