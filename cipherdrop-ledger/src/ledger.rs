//! The access ledger: envelope records, grants, access resolution.

use crate::error::{LedgerError, LedgerResult};
use crate::policy::UploadPolicy;
use crate::types::{Download, FileMetadata, FileRecord, OwnedFile, SharedFile};
use chrono::{DateTime, Utc};
use cipherdrop_blobstore::BlobStore;
use cipherdrop_envelope::EnvelopeMeta;
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Blob store namespace for file ciphertext.
const BLOB_NAMESPACE: &str = "files";

/// Authoritative mapping of `(file, user)` to wrapped content keys.
///
/// Shares its connection with the session authority's database: recipient
/// lookups read the `users` table directly. The ledger itself owns `files`
/// and `file_access`.
pub struct AccessLedger {
    conn: Arc<Mutex<Connection>>,
    blobs: BlobStore,
    policy: UploadPolicy,
}

impl AccessLedger {
    /// Opens (or creates) the ledger at the given path.
    pub fn open(db_path: &Path, policy: UploadPolicy) -> LedgerResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(Arc::new(Mutex::new(conn)), policy)
    }

    /// Opens an in-memory ledger (for testing).
    pub fn open_in_memory(policy: UploadPolicy) -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(Arc::new(Mutex::new(conn)), policy)
    }

    /// Builds a ledger over an existing shared connection (typically the
    /// session authority's, so the `users` table is visible).
    pub fn with_connection(
        conn: Arc<Mutex<Connection>>,
        policy: UploadPolicy,
    ) -> LedgerResult<Self> {
        let blobs = BlobStore::open_with_conn(Arc::clone(&conn))?;
        let ledger = Self { conn, blobs, policy };
        ledger.ensure_tables()?;
        Ok(ledger)
    }

    fn ensure_tables(&self) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS files (
                id VARCHAR PRIMARY KEY,
                owner_id BIGINT NOT NULL,
                filename VARCHAR NOT NULL,
                original_size BIGINT NOT NULL,
                mime_type VARCHAR,
                storage_ref VARCHAR NOT NULL,
                iv VARCHAR NOT NULL,
                integrity_hash VARCHAR NOT NULL,
                encrypted_key_for_owner VARCHAR NOT NULL,
                created_at BIGINT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS file_access (
                file_id VARCHAR NOT NULL,
                shared_with_id BIGINT NOT NULL,
                encrypted_key VARCHAR NOT NULL,
                created_at BIGINT NOT NULL,
                PRIMARY KEY (file_id, shared_with_id)
            );",
        )?;
        Ok(())
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    // ── Upload ──

    /// Accepts an encrypted envelope: validates the declared metadata,
    /// streams the ciphertext in (bounded by the policy's byte cap), writes
    /// the blob, and only then commits the file record.
    ///
    /// A cancelled or failed upload never leaves a record behind: the record
    /// insert happens strictly after the blob write, and a failed insert
    /// removes the orphaned blob.
    pub async fn upload_envelope<R>(
        &self,
        owner_id: i64,
        mut ciphertext: R,
        meta: EnvelopeMeta,
    ) -> LedgerResult<FileRecord>
    where
        R: AsyncRead + Unpin,
    {
        self.policy.validate(&meta)?;
        meta.nonce_bytes()
            .map_err(|e| LedgerError::InvalidEnvelope(e.to_string()))?;
        meta.encrypted_key_bytes()
            .map_err(|e| LedgerError::InvalidEnvelope(e.to_string()))?;

        let max = self.policy.max_payload_bytes as usize;
        let mut bytes = Vec::new();
        let mut chunk = vec![0u8; 64 * 1024];
        loop {
            let n = ciphertext.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            if bytes.len() + n > max {
                return Err(LedgerError::PayloadTooLarge {
                    size: (bytes.len() + n) as u64,
                    max: max as u64,
                });
            }
            bytes.extend_from_slice(&chunk[..n]);
        }

        let record = FileRecord {
            id: Uuid::new_v4().to_string(),
            owner_id,
            filename: meta.filename.clone(),
            original_size: meta.original_size,
            mime_type: meta.mime_type.clone(),
            storage_ref: Uuid::new_v4().to_string(),
            iv: meta.iv.clone(),
            integrity_hash: meta.integrity_hash.clone(),
            encrypted_key_for_owner: meta.encrypted_key.clone(),
            created_at: Utc::now(),
        };

        // Blob first; the record is only visible once its bytes exist
        self.blobs.put(BLOB_NAMESPACE, &record.storage_ref, &bytes)?;

        let inserted = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO files (id, owner_id, filename, original_size, mime_type,
                                    storage_ref, iv, integrity_hash, encrypted_key_for_owner, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    record.id,
                    record.owner_id,
                    record.filename,
                    record.original_size as i64,
                    record.mime_type,
                    record.storage_ref,
                    record.iv,
                    record.integrity_hash,
                    record.encrypted_key_for_owner,
                    record.created_at.timestamp_millis(),
                ],
            )
        };
        if let Err(e) = inserted {
            warn!("file record insert failed, removing orphaned blob: {e}");
            let _ = self.blobs.delete(BLOB_NAMESPACE, &record.storage_ref);
            return Err(e.into());
        }

        info!(
            "file {} uploaded by user {owner_id} ({} ciphertext bytes)",
            record.id,
            bytes.len()
        );
        Ok(record)
    }

    // ── Access resolution ──

    /// Returns the wrapped content key the caller is entitled to: the
    /// owner's wrapping for the owner, the grant's wrapping for a grantee,
    /// and [`LedgerError::AccessDenied`] for anyone else.
    pub fn resolve_access(&self, file_id: &str, caller_id: i64) -> LedgerResult<String> {
        let conn = self.conn.lock().unwrap();
        let (owner_id, owner_key): (i64, String) = match conn.query_row(
            "SELECT owner_id, encrypted_key_for_owner FROM files WHERE id = ?",
            params![file_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        ) {
            Ok(v) => v,
            Err(duckdb::Error::QueryReturnedNoRows) => {
                return Err(LedgerError::FileNotFound(file_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        if owner_id == caller_id {
            return Ok(owner_key);
        }

        match conn.query_row(
            "SELECT encrypted_key FROM file_access WHERE file_id = ? AND shared_with_id = ?",
            params![file_id, caller_id],
            |row| row.get(0),
        ) {
            Ok(key) => Ok(key),
            Err(duckdb::Error::QueryReturnedNoRows) => {
                debug!("access denied: user {caller_id} has no grant for file {file_id}");
                Err(LedgerError::AccessDenied)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetches the ciphertext and an envelope addressed to the caller.
    pub fn download(&self, file_id: &str, caller_id: i64) -> LedgerResult<Download> {
        let wrapped_key = self.resolve_access(file_id, caller_id)?;
        let record = self.record(file_id)?;
        let ciphertext = self.blobs.get(BLOB_NAMESPACE, &record.storage_ref)?;

        // The wire format always labels the key as the owner's field,
        // whichever recipient it is actually wrapped for
        let meta = EnvelopeMeta {
            filename: record.filename,
            iv: record.iv,
            integrity_hash: record.integrity_hash,
            encrypted_key: wrapped_key,
            original_size: record.original_size,
            mime_type: record.mime_type,
        };
        Ok(Download { ciphertext, meta })
    }

    /// Access-checked metadata lookup.
    pub fn file_metadata(&self, file_id: &str, caller_id: i64) -> LedgerResult<FileMetadata> {
        self.resolve_access(file_id, caller_id)?;
        let record = self.record(file_id)?;
        Ok(FileMetadata {
            id: record.id,
            filename: record.filename,
            original_size: record.original_size,
            mime_type: record.mime_type,
            integrity_hash: record.integrity_hash,
            uploaded_at: record.created_at,
        })
    }

    // ── Sharing ──

    /// Records a grant: `recipient_email` may now fetch this file's
    /// ciphertext and their wrapped key.
    ///
    /// The caller must be the owner; the recipient must exist, must have a
    /// registered public key (there is nothing to wrap under otherwise),
    /// must not be the owner; and the grant must not already exist — no
    /// silent overwrite, re-sharing means revoke then grant.
    pub fn grant(
        &self,
        file_id: &str,
        owner_id: i64,
        recipient_email: &str,
        encrypted_key_for_recipient: &str,
    ) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();

        let file_owner: i64 = match conn.query_row(
            "SELECT owner_id FROM files WHERE id = ?",
            params![file_id],
            |row| row.get(0),
        ) {
            Ok(v) => v,
            Err(duckdb::Error::QueryReturnedNoRows) => {
                return Err(LedgerError::FileNotFound(file_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        if file_owner != owner_id {
            return Err(LedgerError::AccessDenied);
        }

        let (recipient_id, recipient_key): (i64, Option<String>) = match conn.query_row(
            "SELECT id, public_key FROM users WHERE email = ?",
            params![recipient_email],
            |row| Ok((row.get(0)?, row.get(1)?)),
        ) {
            Ok(v) => v,
            Err(duckdb::Error::QueryReturnedNoRows) => {
                return Err(LedgerError::RecipientNotFound(recipient_email.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        if recipient_key.is_none() {
            return Err(LedgerError::RecipientMissingKey);
        }
        if recipient_id == owner_id {
            return Err(LedgerError::SelfShare);
        }

        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM file_access WHERE file_id = ? AND shared_with_id = ?",
            params![file_id, recipient_id],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Err(LedgerError::AlreadyShared);
        }

        conn.execute(
            "INSERT INTO file_access (file_id, shared_with_id, encrypted_key, created_at)
             VALUES (?, ?, ?, ?)",
            params![
                file_id,
                recipient_id,
                encrypted_key_for_recipient,
                Utc::now().timestamp_millis()
            ],
        )?;

        info!("file {file_id} shared with {recipient_email}");
        Ok(())
    }

    /// Removes a single grant. The recipient immediately loses access; any
    /// content key bytes they already unwrapped client-side are outside
    /// this system's control.
    pub fn revoke(&self, file_id: &str, owner_id: i64, recipient_id: i64) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();

        let file_owner: i64 = match conn.query_row(
            "SELECT owner_id FROM files WHERE id = ?",
            params![file_id],
            |row| row.get(0),
        ) {
            Ok(v) => v,
            Err(duckdb::Error::QueryReturnedNoRows) => {
                return Err(LedgerError::FileNotFound(file_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        if file_owner != owner_id {
            return Err(LedgerError::AccessDenied);
        }

        let removed = conn.execute(
            "DELETE FROM file_access WHERE file_id = ? AND shared_with_id = ?",
            params![file_id, recipient_id],
        )?;
        if removed == 0 {
            return Err(LedgerError::GrantNotFound);
        }

        info!("revoked access to file {file_id} for user {recipient_id}");
        Ok(())
    }

    /// Deletes a file: every grant, the record, then the blob. Only the
    /// owner may delete.
    pub fn delete_file(&self, file_id: &str, owner_id: i64) -> LedgerResult<()> {
        let storage_ref = {
            let conn = self.conn.lock().unwrap();

            let (file_owner, storage_ref): (i64, String) = match conn.query_row(
                "SELECT owner_id, storage_ref FROM files WHERE id = ?",
                params![file_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            ) {
                Ok(v) => v,
                Err(duckdb::Error::QueryReturnedNoRows) => {
                    return Err(LedgerError::FileNotFound(file_id.to_string()))
                }
                Err(e) => return Err(e.into()),
            };
            if file_owner != owner_id {
                return Err(LedgerError::AccessDenied);
            }

            conn.execute_batch("BEGIN TRANSACTION;")?;
            let result = (|| -> LedgerResult<()> {
                conn.execute("DELETE FROM file_access WHERE file_id = ?", params![file_id])?;
                conn.execute("DELETE FROM files WHERE id = ?", params![file_id])?;
                Ok(())
            })();
            match result {
                Ok(()) => conn.execute_batch("COMMIT;")?,
                Err(e) => {
                    let _ = conn.execute_batch("ROLLBACK;");
                    return Err(e);
                }
            }
            storage_ref
        };

        if let Err(e) = self.blobs.delete(BLOB_NAMESPACE, &storage_ref) {
            // Rows are gone, so access is already revoked; the blob is
            // unreachable garbage at worst
            warn!("blob delete failed for removed file {file_id}: {e}");
        }

        info!("file {file_id} deleted by user {owner_id}");
        Ok(())
    }

    // ── Listings ──

    /// Files owned by this user, newest first.
    pub fn list_owned(&self, owner_id: i64) -> LedgerResult<Vec<OwnedFile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, filename, original_size, mime_type, integrity_hash,
                    encrypted_key_for_owner, created_at
             FROM files WHERE owner_id = ? ORDER BY created_at DESC",
        )?;

        let files: Vec<OwnedFile> = stmt
            .query_map(params![owner_id], |row| {
                Ok(OwnedFile {
                    id: row.get(0)?,
                    filename: row.get(1)?,
                    original_size: row.get::<_, i64>(2)? as u64,
                    mime_type: row.get(3)?,
                    integrity_hash: row.get(4)?,
                    encrypted_key_for_owner: row.get(5)?,
                    created_at: millis_to_datetime(row.get(6)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(files)
    }

    /// Files shared with this user, newest grant first, with the sharer's
    /// identity and the recipient's own wrapped key.
    pub fn list_shared_with(&self, user_id: i64) -> LedgerResult<Vec<SharedFile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT f.id, f.filename, f.original_size, f.mime_type, f.integrity_hash,
                    a.encrypted_key, u.email, u.name, a.created_at
             FROM file_access a
             JOIN files f ON f.id = a.file_id
             JOIN users u ON u.id = f.owner_id
             WHERE a.shared_with_id = ?
             ORDER BY a.created_at DESC",
        )?;

        let files: Vec<SharedFile> = stmt
            .query_map(params![user_id], |row| {
                Ok(SharedFile {
                    id: row.get(0)?,
                    filename: row.get(1)?,
                    original_size: row.get::<_, i64>(2)? as u64,
                    mime_type: row.get(3)?,
                    integrity_hash: row.get(4)?,
                    encrypted_key_for_recipient: row.get(5)?,
                    shared_by_email: row.get(6)?,
                    shared_by_name: row.get(7)?,
                    shared_at: millis_to_datetime(row.get(8)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(files)
    }

    // ── Internals ──

    fn record(&self, file_id: &str) -> LedgerResult<FileRecord> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "SELECT id, owner_id, filename, original_size, mime_type, storage_ref,
                    iv, integrity_hash, encrypted_key_for_owner, created_at
             FROM files WHERE id = ?",
            params![file_id],
            |row| {
                Ok(FileRecord {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    filename: row.get(2)?,
                    original_size: row.get::<_, i64>(3)? as u64,
                    mime_type: row.get(4)?,
                    storage_ref: row.get(5)?,
                    iv: row.get(6)?,
                    integrity_hash: row.get(7)?,
                    encrypted_key_for_owner: row.get(8)?,
                    created_at: millis_to_datetime(row.get(9)?),
                })
            },
        ) {
            Ok(record) => Ok(record),
            Err(duckdb::Error::QueryReturnedNoRows) => {
                Err(LedgerError::FileNotFound(file_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
