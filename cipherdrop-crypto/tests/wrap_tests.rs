//! Adversarial tests for RSA-OAEP content-key wrapping.
//!
//! Cross-key rejection and wrapped-blob tampering are the guarantees the
//! sharing protocol relies on: a wrapped content key must be openable by
//! exactly one private key.

use cipherdrop_crypto::{
    export_private_key_der, export_public_key_b64, generate_random_key, import_private_key_der,
    import_public_key_b64, unwrap_key, wrap_key, CryptoError, KeyPair,
};

// 2048-bit keys keep the suite fast; wrap/unwrap behavior is size-independent
fn test_keypair() -> KeyPair {
    KeyPair::generate_with_bits(2048).unwrap()
}

#[test]
fn wrap_unwrap_roundtrip() {
    let kp = test_keypair();
    let content_key = generate_random_key();

    let wrapped = wrap_key(kp.public(), content_key.as_bytes()).unwrap();
    let unwrapped = unwrap_key(kp.private(), &wrapped).unwrap();

    assert_eq!(unwrapped.as_slice(), content_key.as_bytes());
}

#[test]
fn wrapping_is_randomized() {
    let kp = test_keypair();
    let content_key = generate_random_key();

    let w1 = wrap_key(kp.public(), content_key.as_bytes()).unwrap();
    let w2 = wrap_key(kp.public(), content_key.as_bytes()).unwrap();

    // OAEP is randomized; identical inputs must not produce identical blobs
    assert_ne!(w1, w2);
    assert_eq!(unwrap_key(kp.private(), &w1).unwrap(), unwrap_key(kp.private(), &w2).unwrap());
}

#[test]
fn unwrap_with_wrong_keypair_fails() {
    let kp_a = test_keypair();
    let kp_b = test_keypair();
    let content_key = generate_random_key();

    let wrapped = wrap_key(kp_a.public(), content_key.as_bytes()).unwrap();
    let err = unwrap_key(kp_b.private(), &wrapped).unwrap_err();

    assert!(matches!(err, CryptoError::Unwrap));
}

#[test]
fn tampered_wrapped_key_fails() {
    let kp = test_keypair();
    let content_key = generate_random_key();

    let mut wrapped = wrap_key(kp.public(), content_key.as_bytes()).unwrap();
    let last = wrapped.len() - 1;
    wrapped[last] ^= 0x01;

    assert!(unwrap_key(kp.private(), &wrapped).is_err());
}

#[test]
fn truncated_wrapped_key_fails() {
    let kp = test_keypair();
    let content_key = generate_random_key();

    let mut wrapped = wrap_key(kp.public(), content_key.as_bytes()).unwrap();
    wrapped.truncate(wrapped.len() / 2);

    assert!(unwrap_key(kp.private(), &wrapped).is_err());
}

#[test]
fn public_key_b64_roundtrip() {
    let kp = test_keypair();
    let encoded = export_public_key_b64(kp.public()).unwrap();
    let imported = import_public_key_b64(&encoded).unwrap();
    assert_eq!(&imported, kp.public());
}

#[test]
fn imported_public_key_wraps_for_original_private_key() {
    let kp = test_keypair();
    let content_key = generate_random_key();

    // Simulate the share flow: the sender only ever sees the b64 form
    let encoded = export_public_key_b64(kp.public()).unwrap();
    let imported = import_public_key_b64(&encoded).unwrap();

    let wrapped = wrap_key(&imported, content_key.as_bytes()).unwrap();
    assert_eq!(
        unwrap_key(kp.private(), &wrapped).unwrap().as_slice(),
        content_key.as_bytes()
    );
}

#[test]
fn private_key_der_roundtrip() {
    let kp = test_keypair();
    let der = export_private_key_der(kp.private()).unwrap();
    let imported = import_private_key_der(&der).unwrap();
    assert_eq!(&imported, kp.private());
}

#[test]
fn garbage_public_key_rejected() {
    assert!(import_public_key_b64("not-base64!!!").is_err());
    assert!(import_public_key_b64("aGVsbG8gd29ybGQ=").is_err()); // valid b64, not SPKI
}

#[test]
fn modulus_below_floor_rejected() {
    let err = KeyPair::generate_with_bits(1024).unwrap_err();
    assert!(matches!(err, CryptoError::KeyGeneration(_)));
}
