//! Key vault lifecycle tests: protection, activation, reset.

use cipherdrop_crypto::KeyPair;
use cipherdrop_keyvault::{protect, unlock, BundleStore, KeyVault, VaultError};

fn test_keypair() -> KeyPair {
    KeyPair::generate_with_bits(2048).unwrap()
}

// Builds a vault with a pre-protected bundle so tests skip 4096-bit keygen.
fn vault_with_keys(email: &str, passphrase: &str) -> (KeyVault, KeyPair) {
    let keypair = test_keypair();
    let vault = KeyVault::open_in_memory().unwrap();
    let bundle = protect(keypair.private(), passphrase).unwrap();
    vault.import_bundle(email, &bundle).unwrap();
    (vault, keypair)
}

// ── Bundle protection ──

#[test]
fn protect_unlock_roundtrip() {
    let keypair = test_keypair();
    let bundle = protect(keypair.private(), "hunter2hunter2").unwrap();
    let recovered = unlock(&bundle, "hunter2hunter2").unwrap();
    assert_eq!(&recovered, keypair.private());
}

#[test]
fn wrong_passphrase_reports_invalid_passphrase() {
    let keypair = test_keypair();
    let bundle = protect(keypair.private(), "correct-passphrase").unwrap();

    let err = unlock(&bundle, "wrong-passphrase").unwrap_err();
    assert!(matches!(err, VaultError::InvalidPassphrase));
}

#[test]
fn corrupted_bundle_reports_invalid_passphrase() {
    // A corrupted bundle must be indistinguishable from a wrong passphrase
    let keypair = test_keypair();
    let mut bundle = protect(keypair.private(), "correct-passphrase").unwrap();
    if let Some(byte) = bundle.encrypted.ciphertext.first_mut() {
        *byte ^= 0xFF;
    }

    let err = unlock(&bundle, "correct-passphrase").unwrap_err();
    assert!(matches!(err, VaultError::InvalidPassphrase));
}

#[test]
fn each_protect_uses_a_fresh_salt() {
    let keypair = test_keypair();
    let b1 = protect(keypair.private(), "pass").unwrap();
    let b2 = protect(keypair.private(), "pass").unwrap();
    assert_ne!(b1.salt, b2.salt);
}

// ── Activation lifecycle ──

#[test]
fn activate_exposes_private_key() {
    let (vault, keypair) = vault_with_keys("alice@example.com", "al1ce-passphrase");

    assert!(vault.current().is_none());
    vault.activate("alice@example.com", "al1ce-passphrase").unwrap();

    assert!(vault.is_activated("alice@example.com"));
    assert!(!vault.is_activated("bob@example.com"));
    assert_eq!(vault.current_email().as_deref(), Some("alice@example.com"));
    assert_eq!(vault.current().unwrap().as_ref(), keypair.private());
}

#[test]
fn activate_with_wrong_passphrase_leaves_slot_unchanged() {
    let (vault, _) = vault_with_keys("alice@example.com", "al1ce-passphrase");
    vault.activate("alice@example.com", "al1ce-passphrase").unwrap();

    let err = vault.activate("alice@example.com", "bad").unwrap_err();
    assert!(matches!(err, VaultError::InvalidPassphrase));
    // The earlier activation survives a failed attempt
    assert!(vault.is_activated("alice@example.com"));
}

#[test]
fn activate_without_keys_reports_no_keys() {
    let vault = KeyVault::open_in_memory().unwrap();
    let err = vault.activate("nobody@example.com", "whatever").unwrap_err();
    assert!(matches!(err, VaultError::NoKeys(_)));
}

#[test]
fn second_activation_overwrites_the_first() {
    let keypair_a = test_keypair();
    let keypair_b = test_keypair();
    let vault = KeyVault::open_in_memory().unwrap();
    vault
        .import_bundle("a@example.com", &protect(keypair_a.private(), "pass-a").unwrap())
        .unwrap();
    vault
        .import_bundle("b@example.com", &protect(keypair_b.private(), "pass-b").unwrap())
        .unwrap();

    vault.activate("a@example.com", "pass-a").unwrap();
    vault.activate("b@example.com", "pass-b").unwrap();

    assert!(!vault.is_activated("a@example.com"));
    assert!(vault.is_activated("b@example.com"));
    assert_eq!(vault.current().unwrap().as_ref(), keypair_b.private());
}

#[test]
fn deactivate_clears_the_slot() {
    let (vault, _) = vault_with_keys("alice@example.com", "al1ce-passphrase");
    vault.activate("alice@example.com", "al1ce-passphrase").unwrap();

    vault.deactivate();

    assert!(!vault.is_activated("alice@example.com"));
    assert!(vault.current().is_none());
    assert!(vault.current_email().is_none());
}

// ── Setup and reset ──

#[test]
fn setup_keys_generates_and_stores_a_bundle() {
    let vault = KeyVault::open_in_memory().unwrap();
    let keypair = vault.setup_keys("carol@example.com", "car0l-passphrase").unwrap();

    assert!(vault.has_keys("carol@example.com").unwrap());
    vault.activate("carol@example.com", "car0l-passphrase").unwrap();
    assert_eq!(vault.current().unwrap().as_ref(), keypair.private());
}

#[test]
fn setup_keys_twice_is_rejected() {
    let (vault, _) = vault_with_keys("alice@example.com", "pass");
    let err = vault.setup_keys("alice@example.com", "pass").unwrap_err();
    assert!(matches!(err, VaultError::KeysExist(_)));
}

#[test]
fn reset_keys_deletes_bundle_and_deactivates() {
    let (vault, _) = vault_with_keys("alice@example.com", "al1ce-passphrase");
    vault.activate("alice@example.com", "al1ce-passphrase").unwrap();

    vault.reset_keys("alice@example.com").unwrap();

    assert!(!vault.has_keys("alice@example.com").unwrap());
    assert!(vault.current().is_none());
    assert!(matches!(
        vault.activate("alice@example.com", "al1ce-passphrase").unwrap_err(),
        VaultError::NoKeys(_)
    ));
}

// ── Persistence ──

#[test]
fn bundles_survive_store_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("keys.db");
    let keypair = test_keypair();

    {
        let store = BundleStore::open(&db_path).unwrap();
        let bundle = protect(keypair.private(), "persistent-pass").unwrap();
        store.save("dave@example.com", &bundle).unwrap();
    }

    let vault = KeyVault::open(&db_path).unwrap();
    vault.activate("dave@example.com", "persistent-pass").unwrap();
    assert_eq!(vault.current().unwrap().as_ref(), keypair.private());
}
