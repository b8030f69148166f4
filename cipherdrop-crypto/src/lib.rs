//! Cryptographic primitives for CipherDrop.
//!
//! Provides the building blocks of the end-to-end envelope protocol:
//! - Argon2id for key derivation from passphrases
//! - ChaCha20-Poly1305 for authenticated content encryption
//! - RSA-OAEP (SHA-256) for wrapping content keys under a user's public key
//! - SHA-256 for ciphertext integrity binding
//!
//! # Architecture
//!
//! Every file is encrypted under its own random 256-bit content key. The
//! content key itself is never stored in the clear: each copy is wrapped
//! under exactly one recipient's RSA public key, so the server only ever
//! relays wrapped copies it cannot open. A user's private key is in turn
//! protected at rest by a key derived from their passphrase.
//!
//! This layer is stateless; key custody and envelope orchestration live in
//! `cipherdrop-keyvault` and `cipherdrop-envelope`.

mod cipher;
mod error;
mod hash;
mod key;
mod keypair;

pub use cipher::{decrypt, encrypt, EncryptedData, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use hash::sha256_hex;
pub use key::{
    derive_key, generate_random_key, DerivedKey, KdfParams, Salt, KEY_SIZE, SALT_SIZE,
};
pub use keypair::{
    export_private_key_der, export_public_key_b64, import_private_key_der,
    import_public_key_b64, unwrap_key, wrap_key, KeyPair, RSA_MODULUS_BITS,
};
