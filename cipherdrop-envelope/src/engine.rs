//! Seal, open, and reshare operations.

use crate::error::{EnvelopeError, EnvelopeResult};
use cipherdrop_crypto::{
    decrypt, encrypt, generate_random_key, sha256_hex, unwrap_key, wrap_key, DerivedKey,
    EncryptedData, NONCE_SIZE,
};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

/// The output of sealing one file: everything the server stores, none of
/// which it can use to recover the plaintext.
#[derive(Clone, Debug)]
pub struct SealedFile {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_SIZE],
    /// hex(SHA-256(ciphertext)) — bound to the ciphertext so verification
    /// never requires decryption.
    pub integrity_hash: String,
    /// The content key wrapped under the owner's public key.
    pub wrapped_key_for_owner: Vec<u8>,
}

/// Encrypts a file under a fresh content key and wraps that key for the
/// owner.
///
/// The content key exists unwrapped only inside this call and is zeroized
/// on return; the plaintext is never copied beyond what encryption needs.
pub fn seal(plaintext: &[u8], owner_public: &RsaPublicKey) -> EnvelopeResult<SealedFile> {
    let content_key = generate_random_key();

    let EncryptedData { nonce, ciphertext } = encrypt(&content_key, plaintext)?;
    let integrity_hash = sha256_hex(&ciphertext);
    let wrapped_key_for_owner = wrap_key(owner_public, content_key.as_bytes())?;

    debug!(
        size = plaintext.len(),
        "sealed file ({} ciphertext bytes)",
        ciphertext.len()
    );

    Ok(SealedFile {
        ciphertext,
        nonce,
        integrity_hash,
        wrapped_key_for_owner,
    })
}

/// Opens an envelope: verifies integrity, unwraps the content key, decrypts.
///
/// Failure order is part of the contract:
/// 1. recomputed ciphertext hash vs `expected_hash` — mismatch fails with
///    [`EnvelopeError::IntegrityMismatch`] before any key material is touched;
/// 2. content-key unwrap — failure is [`EnvelopeError::KeyMismatch`] (wrapped
///    for a different keypair than the caller's);
/// 3. AEAD decryption — an authentication failure here means the nonce or
///    ciphertext was corrupted in a way the hash did not cover, and surfaces
///    as [`EnvelopeError::IntegrityMismatch`].
pub fn open(
    ciphertext: &[u8],
    nonce: [u8; NONCE_SIZE],
    wrapped_key: &[u8],
    private_key: &RsaPrivateKey,
    expected_hash: &str,
) -> EnvelopeResult<Vec<u8>> {
    if !sha256_hex(ciphertext).eq_ignore_ascii_case(expected_hash) {
        return Err(EnvelopeError::IntegrityMismatch);
    }

    let raw = Zeroizing::new(
        unwrap_key(private_key, wrapped_key).map_err(|_| EnvelopeError::KeyMismatch)?,
    );
    let content_key =
        DerivedKey::try_from_slice(&raw).map_err(|_| EnvelopeError::KeyMismatch)?;

    let data = EncryptedData {
        nonce,
        ciphertext: ciphertext.to_vec(),
    };
    decrypt(&content_key, &data).map_err(|_| EnvelopeError::IntegrityMismatch)
}

/// Re-wraps a file's content key for a new recipient.
///
/// Unwraps with the owner's private key, immediately wraps under the
/// recipient's public key, and zeroizes the raw key. The ciphertext is never
/// read: sharing costs the same for a 5-byte file and a 10 MiB one, and each
/// grant can be revoked without touching any other.
pub fn reshare(
    wrapped_key_for_owner: &[u8],
    owner_private: &RsaPrivateKey,
    recipient_public: &RsaPublicKey,
) -> EnvelopeResult<Vec<u8>> {
    let raw = Zeroizing::new(
        unwrap_key(owner_private, wrapped_key_for_owner)
            .map_err(|_| EnvelopeError::KeyMismatch)?,
    );
    Ok(wrap_key(recipient_public, &raw)?)
}

// Async wrappers. RSA and per-file AEAD are CPU-bound; on a request path they
// run on the blocking pool rather than stalling the event loop.

pub async fn seal_async(
    plaintext: Vec<u8>,
    owner_public: RsaPublicKey,
) -> EnvelopeResult<SealedFile> {
    tokio::task::spawn_blocking(move || seal(&plaintext, &owner_public))
        .await
        .map_err(|e| EnvelopeError::TaskJoin(e.to_string()))?
}

pub async fn open_async(
    ciphertext: Vec<u8>,
    nonce: [u8; NONCE_SIZE],
    wrapped_key: Vec<u8>,
    private_key: Arc<RsaPrivateKey>,
    expected_hash: String,
) -> EnvelopeResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        open(&ciphertext, nonce, &wrapped_key, &private_key, &expected_hash)
    })
    .await
    .map_err(|e| EnvelopeError::TaskJoin(e.to_string()))?
}

pub async fn reshare_async(
    wrapped_key_for_owner: Vec<u8>,
    owner_private: Arc<RsaPrivateKey>,
    recipient_public: RsaPublicKey,
) -> EnvelopeResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        reshare(&wrapped_key_for_owner, &owner_private, &recipient_public)
    })
    .await
    .map_err(|e| EnvelopeError::TaskJoin(e.to_string()))?
}
