//! The key vault: bundle custody plus the session-scoped activated slot.

use crate::bundle::{protect, unlock, EncryptedKeyBundle};
use crate::error::{VaultError, VaultResult};
use crate::store::BundleStore;
use cipherdrop_crypto::KeyPair;
use rsa::RsaPrivateKey;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// The unlocked identity occupying the vault's activated slot.
#[derive(Clone)]
pub struct ActivatedKey {
    pub email: String,
    pub private_key: Arc<RsaPrivateKey>,
}

/// Manages a user's keypair lifecycle: setup, passphrase unlock, and the
/// single in-memory activation valid for the session.
///
/// The slot is a swappable cell, not ambient global state: components that
/// need the active key hold a reference to the vault (or an `Arc` clone of
/// the key) and never mutate the slot themselves. `activate` and
/// `deactivate` replace the slot atomically; concurrent seal/open/reshare
/// calls read it without locking beyond the slot swap.
pub struct KeyVault {
    store: BundleStore,
    active: RwLock<Option<ActivatedKey>>,
}

impl KeyVault {
    pub fn new(store: BundleStore) -> Self {
        Self {
            store,
            active: RwLock::new(None),
        }
    }

    /// Opens a vault over a DuckDB file at the given path.
    pub fn open(db_path: &Path) -> VaultResult<Self> {
        Ok(Self::new(BundleStore::open(db_path)?))
    }

    /// Opens a vault over an in-memory store (for testing).
    pub fn open_in_memory() -> VaultResult<Self> {
        Ok(Self::new(BundleStore::open_in_memory()?))
    }

    /// Generates a fresh keypair, protects the private half under the
    /// passphrase, and stores the bundle for `email`.
    ///
    /// Returns the keypair so the caller can register the public half with
    /// the server. Fails if keys already exist — regeneration would orphan
    /// every content key wrapped under the old public key, so it must go
    /// through the explicit [`reset_keys`](Self::reset_keys) path.
    pub fn setup_keys(&self, email: &str, passphrase: &str) -> VaultResult<KeyPair> {
        if self.store.exists(email)? {
            return Err(VaultError::KeysExist(email.to_string()));
        }

        let keypair = KeyPair::generate()?;
        let bundle = protect(keypair.private(), passphrase)?;
        self.store.save(email, &bundle)?;

        info!("encryption keys set up for {email}");
        Ok(keypair)
    }

    /// Loads and unlocks the bundle for `email`, storing the result as the
    /// sole activated identity. Overwrites any prior activation.
    pub fn activate(&self, email: &str, passphrase: &str) -> VaultResult<()> {
        let bundle = self
            .store
            .load(email)?
            .ok_or_else(|| VaultError::NoKeys(email.to_string()))?;

        let private_key = unlock(&bundle, passphrase).inspect_err(|_| {
            warn!("key activation failed for {email}");
        })?;

        let mut slot = self.active.write().unwrap();
        if let Some(prev) = slot.as_ref() {
            debug!("replacing activated keys for {} with {email}", prev.email);
        }
        *slot = Some(ActivatedKey {
            email: email.to_string(),
            private_key: Arc::new(private_key),
        });

        info!("encryption keys activated for {email}");
        Ok(())
    }

    /// Clears the activated slot. Must be called on logout.
    pub fn deactivate(&self) {
        let mut slot = self.active.write().unwrap();
        if slot.take().is_some() {
            debug!("encryption keys cleared from memory");
        }
    }

    /// Whether `email`'s keys currently occupy the activated slot.
    pub fn is_activated(&self, email: &str) -> bool {
        self.active
            .read()
            .unwrap()
            .as_ref()
            .is_some_and(|a| a.email == email)
    }

    /// The currently activated private key, if any.
    pub fn current(&self) -> Option<Arc<RsaPrivateKey>> {
        self.active
            .read()
            .unwrap()
            .as_ref()
            .map(|a| Arc::clone(&a.private_key))
    }

    /// The email of the currently activated identity, if any.
    pub fn current_email(&self) -> Option<String> {
        self.active.read().unwrap().as_ref().map(|a| a.email.clone())
    }

    /// Whether keys have been set up for this email.
    pub fn has_keys(&self, email: &str) -> VaultResult<bool> {
        self.store.exists(email)
    }

    /// Deletes the stored bundle for `email` and deactivates it if active.
    ///
    /// Key rotation is not supported: content keys wrapped under the old
    /// public key are orphaned by a reset, and the user must re-upload or
    /// be re-shared under the new keys.
    pub fn reset_keys(&self, email: &str) -> VaultResult<()> {
        self.store.delete(email)?;

        let mut slot = self.active.write().unwrap();
        if slot.as_ref().is_some_and(|a| a.email == email) {
            *slot = None;
        }

        warn!("encryption keys reset for {email}; previously wrapped content keys are orphaned");
        Ok(())
    }

    /// Direct access to the underlying bundle store.
    pub fn store(&self) -> &BundleStore {
        &self.store
    }

    /// Stores an externally created bundle (import / restore path).
    pub fn import_bundle(&self, email: &str, bundle: &EncryptedKeyBundle) -> VaultResult<()> {
        self.store.save(email, bundle)
    }
}
