//! Client-local bundle storage.
//!
//! A single key-value table mapping user email to their encrypted private
//! key bundle. This store lives on the client and is never synced.

use crate::bundle::EncryptedKeyBundle;
use crate::error::VaultResult;
use chrono::Utc;
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Durable local store for [`EncryptedKeyBundle`]s, keyed by email.
#[derive(Clone)]
pub struct BundleStore {
    conn: Arc<Mutex<Connection>>,
}

impl BundleStore {
    /// Opens (or creates) a bundle store backed by a DuckDB file.
    pub fn open(db_path: &Path) -> VaultResult<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> VaultResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Opens with an existing shared connection.
    pub fn open_with_conn(conn: Arc<Mutex<Connection>>) -> VaultResult<Self> {
        let store = Self { conn };
        store.ensure_tables()?;
        Ok(store)
    }

    fn ensure_tables(&self) -> VaultResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS key_bundles (
                email VARCHAR PRIMARY KEY,
                bundle BLOB NOT NULL,
                created_at BIGINT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Stores (or replaces) the bundle for an email.
    pub fn save(&self, email: &str, bundle: &EncryptedKeyBundle) -> VaultResult<()> {
        let bytes = serde_json::to_vec(bundle)?;
        let now = Utc::now().timestamp_millis();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO key_bundles (email, bundle, created_at) VALUES (?, ?, ?)",
            params![email, bytes, now],
        )?;
        Ok(())
    }

    /// Loads the bundle for an email, if one exists.
    pub fn load(&self, email: &str) -> VaultResult<Option<EncryptedKeyBundle>> {
        let conn = self.conn.lock().unwrap();
        let row: Result<Vec<u8>, duckdb::Error> = conn.query_row(
            "SELECT bundle FROM key_bundles WHERE email = ?",
            params![email],
            |row| row.get(0),
        );

        match row {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a bundle exists for this email.
    pub fn exists(&self, email: &str) -> VaultResult<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM key_bundles WHERE email = ?",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Deletes the bundle for an email. Absence is not an error.
    pub fn delete(&self, email: &str) -> VaultResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM key_bundles WHERE email = ?", params![email])?;
        Ok(())
    }
}
