//! Passphrase protection of the RSA private key.

use crate::error::{VaultError, VaultResult};
use cipherdrop_crypto::{
    decrypt, derive_key, encrypt, export_private_key_der, import_private_key_der, EncryptedData,
    KdfParams, Salt, SALT_SIZE,
};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};

/// A private key encrypted with a passphrase (Argon2id -> ChaCha20-Poly1305).
///
/// Bundles the KDF salt with the ciphertext so the passphrase is the only
/// input needed to unlock. Stored client-side only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedKeyBundle {
    pub salt: [u8; SALT_SIZE],
    pub encrypted: EncryptedData,
}

/// Encrypts a private key's PKCS#8 export under a passphrase-derived key.
pub fn protect(private_key: &RsaPrivateKey, passphrase: &str) -> VaultResult<EncryptedKeyBundle> {
    let salt = Salt::random();
    let key = derive_key(passphrase, &salt, &KdfParams::default())?;
    let pkcs8 = export_private_key_der(private_key)?;
    let encrypted = encrypt(&key, &pkcs8)?;

    Ok(EncryptedKeyBundle {
        salt: *salt.as_bytes(),
        encrypted,
    })
}

/// Re-derives the key from the bundle's salt and decrypts the private key.
///
/// Every failure past key derivation — AEAD authentication, PKCS#8 parse —
/// is reported uniformly as [`VaultError::InvalidPassphrase`] so the error
/// cannot be used as an oracle for bundle corruption.
pub fn unlock(bundle: &EncryptedKeyBundle, passphrase: &str) -> VaultResult<RsaPrivateKey> {
    let salt = Salt::from_bytes(bundle.salt);
    let key = derive_key(passphrase, &salt, &KdfParams::default())?;

    let pkcs8 = decrypt(&key, &bundle.encrypted).map_err(|_| VaultError::InvalidPassphrase)?;
    import_private_key_der(&pkcs8).map_err(|_| VaultError::InvalidPassphrase)
}
