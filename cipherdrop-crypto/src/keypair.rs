//! User RSA keypairs and content-key wrapping (RSA-OAEP, SHA-256).
//!
//! The public key is each user's sharing address: wrapping a content key
//! under it is the only way to grant that user access to a file. Keys are
//! exchanged as base64 SPKI DER; the private half is exported as PKCS#8 DER
//! only so the key vault can encrypt it at rest.

use crate::error::{CryptoError, CryptoResult};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

/// RSA modulus size for newly generated keypairs.
pub const RSA_MODULUS_BITS: usize = 4096;

/// A user's RSA keypair.
pub struct KeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl KeyPair {
    /// Generates a fresh 4096-bit keypair.
    pub fn generate() -> CryptoResult<Self> {
        Self::generate_with_bits(RSA_MODULUS_BITS)
    }

    /// Generates a keypair with an explicit modulus size (2048-bit minimum).
    pub fn generate_with_bits(bits: usize) -> CryptoResult<Self> {
        if bits < 2048 {
            return Err(CryptoError::KeyGeneration(format!(
                "modulus too small: {bits} bits (minimum 2048)"
            )));
        }
        let private = RsaPrivateKey::new(&mut rand::rngs::OsRng, bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private, public })
    }

    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        Self { private, public }
    }

    pub fn public(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn private(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn into_private(self) -> RsaPrivateKey {
        self.private
    }
}

/// Exports a public key as base64-encoded SPKI DER (the form registered
/// with the server directory).
pub fn export_public_key_b64(public: &RsaPublicKey) -> CryptoResult<String> {
    let der = public
        .to_public_key_der()
        .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
    Ok(B64.encode(der.as_bytes()))
}

/// Imports a public key from base64-encoded SPKI DER.
pub fn import_public_key_b64(encoded: &str) -> CryptoResult<RsaPublicKey> {
    let der = B64
        .decode(encoded)
        .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
    RsaPublicKey::from_public_key_der(&der).map_err(|e| CryptoError::KeyEncoding(e.to_string()))
}

/// Exports a private key as PKCS#8 DER bytes, zeroized on drop.
pub fn export_private_key_der(private: &RsaPrivateKey) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let doc = private
        .to_pkcs8_der()
        .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
    Ok(Zeroizing::new(doc.as_bytes().to_vec()))
}

/// Imports a private key from PKCS#8 DER bytes.
pub fn import_private_key_der(der: &[u8]) -> CryptoResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_der(der).map_err(|e| CryptoError::KeyEncoding(e.to_string()))
}

/// Wraps raw symmetric key bytes under a recipient's public key.
pub fn wrap_key(public: &RsaPublicKey, raw: &[u8]) -> CryptoResult<Vec<u8>> {
    public
        .encrypt(&mut rand::rngs::OsRng, Oaep::new::<Sha256>(), raw)
        .map_err(|e| CryptoError::Wrap(e.to_string()))
}

/// Unwraps symmetric key bytes with the matching private key.
///
/// OAEP decryption failure carries no detail on purpose: it almost always
/// means the key was wrapped for a different keypair.
pub fn unwrap_key(private: &RsaPrivateKey, wrapped: &[u8]) -> CryptoResult<Vec<u8>> {
    private
        .decrypt(Oaep::new::<Sha256>(), wrapped)
        .map_err(|_| CryptoError::Unwrap)
}
