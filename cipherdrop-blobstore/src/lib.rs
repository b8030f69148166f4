//! Namespace-scoped opaque blob storage.
//!
//! The access ledger hands this store already-encrypted bytes under an
//! opaque reference and gets the same bytes back. The store never
//! interprets its contents — integrity and confidentiality are the envelope
//! layer's business.

use chrono::Utc;
use duckdb::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};

// ============================================================================
// Error types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("blob not found: {0}/{1}")]
    NotFound(String, String),
    #[error("storage error: {0}")]
    Storage(#[from] duckdb::Error),
}

pub type BlobStoreResult<T> = Result<T, BlobStoreError>;

// ============================================================================
// BlobMetadata
// ============================================================================

#[derive(Debug, Serialize)]
pub struct BlobMetadata {
    pub namespace: String,
    pub blob_id: String,
    pub size: i64,
    pub created_at: i64,
    pub modified_at: i64,
}

// ============================================================================
// BlobStore
// ============================================================================

pub struct BlobStore {
    conn: Arc<Mutex<Connection>>,
}

impl BlobStore {
    /// Open a blob store backed by a DuckDB file.
    pub fn open(db_path: &Path) -> BlobStoreResult<Self> {
        let conn = if db_path.to_str() == Some(":memory:") {
            Connection::open_in_memory()
        } else {
            Connection::open(db_path)
        }?;

        // Cap memory/threads — DuckDB defaults to ~80% RAM per connection
        if db_path.to_str() != Some(":memory:") {
            conn.execute_batch("PRAGMA memory_limit='128MB'; PRAGMA threads=1;")?;
        }

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Open with an existing shared connection.
    pub fn open_with_conn(conn: Arc<Mutex<Connection>>) -> BlobStoreResult<Self> {
        let store = Self { conn };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Open in-memory.
    pub fn open_in_memory() -> BlobStoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.ensure_tables()?;
        Ok(store)
    }

    fn ensure_tables(&self) -> BlobStoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS blobs (
                namespace VARCHAR NOT NULL,
                blob_id VARCHAR NOT NULL,
                data BLOB NOT NULL,
                size BIGINT NOT NULL DEFAULT 0,
                created_at BIGINT NOT NULL,
                modified_at BIGINT NOT NULL,
                PRIMARY KEY (namespace, blob_id)
            );",
        )?;
        Ok(())
    }

    /// Store a blob. Replaces any existing blob under the same reference,
    /// preserving its original creation time.
    pub fn put(&self, namespace: &str, id: &str, data: &[u8]) -> BlobStoreResult<()> {
        let now = Utc::now().timestamp_millis();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO blobs (namespace, blob_id, data, size, created_at, modified_at)
             VALUES (?, ?, ?, ?, COALESCE((SELECT created_at FROM blobs WHERE namespace = ? AND blob_id = ?), ?), ?)",
            params![namespace, id, data, data.len() as i64, namespace, id, now, now],
        )?;

        Ok(())
    }

    /// Read a blob's bytes.
    pub fn get(&self, namespace: &str, id: &str) -> BlobStoreResult<Vec<u8>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT data FROM blobs WHERE namespace = ? AND blob_id = ?",
            params![namespace, id],
            |row| row.get(0),
        )
        .map_err(|_| BlobStoreError::NotFound(namespace.to_string(), id.to_string()))
    }

    /// Delete a blob.
    pub fn delete(&self, namespace: &str, id: &str) -> BlobStoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "DELETE FROM blobs WHERE namespace = ? AND blob_id = ?",
            params![namespace, id],
        )?;

        if affected == 0 {
            return Err(BlobStoreError::NotFound(
                namespace.to_string(),
                id.to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a blob exists under this reference.
    pub fn exists(&self, namespace: &str, id: &str) -> BlobStoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM blobs WHERE namespace = ? AND blob_id = ?",
            params![namespace, id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List blob metadata for a namespace.
    pub fn list(&self, namespace: &str) -> BlobStoreResult<Vec<BlobMetadata>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT namespace, blob_id, size, created_at, modified_at
             FROM blobs WHERE namespace = ? ORDER BY modified_at DESC",
        )?;

        let items: Vec<BlobMetadata> = stmt
            .query_map(params![namespace], |row| {
                Ok(BlobMetadata {
                    namespace: row.get(0)?,
                    blob_id: row.get(1)?,
                    size: row.get(2)?,
                    created_at: row.get(3)?,
                    modified_at: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(items)
    }
}
