//! Adversarial tests for ChaCha20-Poly1305 content encryption.
//!
//! Wrong-key decryption, ciphertext tampering, nonce corruption, and
//! truncation must all fail closed — these are the guarantees the envelope
//! engine's `IntegrityMismatch` reporting is built on.

use cipherdrop_crypto::{
    decrypt, derive_key, encrypt, generate_random_key, CryptoError, KdfParams, Salt,
};

// ── Wrong Key ──

#[test]
fn decrypt_with_wrong_key_returns_error() {
    let key_a = generate_random_key();
    let key_b = generate_random_key();

    let encrypted = encrypt(&key_a, b"file contents that must not leak").unwrap();
    let err = decrypt(&key_b, &encrypted).unwrap_err();

    assert!(matches!(err, CryptoError::Decryption));
}

// ── Ciphertext Tampering ──

#[test]
fn single_bit_flip_in_ciphertext_detected() {
    let key = generate_random_key();
    let encrypted = encrypt(&key, b"integrity-protected data").unwrap();

    let mut tampered = encrypted.clone();
    if let Some(byte) = tampered.ciphertext.last_mut() {
        *byte ^= 0x01;
    }

    assert!(
        decrypt(&key, &tampered).is_err(),
        "single bit flip must be detected by the Poly1305 tag"
    );
}

#[test]
fn every_byte_position_tampering_detected() {
    let key = generate_random_key();
    let encrypted = encrypt(&key, b"test data for position tampering").unwrap();

    for i in 0..encrypted.ciphertext.len() {
        let mut tampered = encrypted.clone();
        tampered.ciphertext[i] ^= 0xFF;
        assert!(
            decrypt(&key, &tampered).is_err(),
            "tampering at byte {i} should be detected"
        );
    }
}

#[test]
fn every_nonce_bit_flip_detected() {
    let key = generate_random_key();
    let encrypted = encrypt(&key, b"nonce integrity").unwrap();

    for i in 0..encrypted.nonce.len() {
        let mut tampered = encrypted.clone();
        tampered.nonce[i] ^= 0x01;
        assert!(
            decrypt(&key, &tampered).is_err(),
            "nonce corruption at byte {i} should be detected"
        );
    }
}

#[test]
fn truncated_ciphertext_detected() {
    let key = generate_random_key();
    let mut encrypted = encrypt(&key, b"truncation target").unwrap();
    encrypted.ciphertext.pop();
    assert!(decrypt(&key, &encrypted).is_err());
}

#[test]
fn appended_bytes_detected() {
    let key = generate_random_key();
    let mut encrypted = encrypt(&key, b"append target").unwrap();
    encrypted.ciphertext.push(0xFF);
    assert!(decrypt(&key, &encrypted).is_err());
}

// ── Boundaries ──

#[test]
fn empty_plaintext_roundtrips() {
    let key = generate_random_key();
    let encrypted = encrypt(&key, b"").unwrap();
    assert_eq!(decrypt(&key, &encrypted).unwrap(), b"");
}

#[test]
fn passphrase_derived_key_encrypts() {
    let salt = Salt::random();
    let key = derive_key("correct-horse-battery-staple", &salt, &KdfParams::default()).unwrap();
    let encrypted = encrypt(&key, b"pkcs8 private key bytes").unwrap();

    let rederived = derive_key("correct-horse-battery-staple", &salt, &KdfParams::default()).unwrap();
    assert_eq!(decrypt(&rederived, &encrypted).unwrap(), b"pkcs8 private key bytes");
}

#[test]
fn wrong_passphrase_fails_to_decrypt() {
    let salt = Salt::random();
    let key = derive_key("right", &salt, &KdfParams::default()).unwrap();
    let encrypted = encrypt(&key, b"secret").unwrap();

    let wrong = derive_key("wrong", &salt, &KdfParams::default()).unwrap();
    assert!(decrypt(&wrong, &encrypted).is_err());
}

#[test]
fn encrypted_data_serialization_roundtrip() {
    let key = generate_random_key();
    let encrypted = encrypt(&key, b"serialize me").unwrap();

    let json = serde_json::to_string(&encrypted).unwrap();
    let deserialized: cipherdrop_crypto::EncryptedData = serde_json::from_str(&json).unwrap();

    assert_eq!(decrypt(&key, &deserialized).unwrap(), b"serialize me");
}

// Property-based tests
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn encrypt_decrypt_always_roundtrips(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let key = generate_random_key();
            let encrypted = encrypt(&key, &data).unwrap();
            prop_assert_eq!(decrypt(&key, &encrypted).unwrap(), data);
        }
    }
}
