//! The session authority: registration, login, credential rotation.

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::types::{AccessClaims, AuthResponse, UserIdentity};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Claims embedded in a refresh credential.
///
/// `jti` makes two credentials issued in the same second distinct, so the
/// token column's primary key never collides for concurrent logins.
#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    id: i64,
    email: String,
    jti: String,
    exp: i64,
}

/// Issues and rotates credentials; owns the `users` and
/// `refresh_credentials` tables.
pub struct SessionAuthority {
    conn: Arc<Mutex<Connection>>,
    config: SessionConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionAuthority {
    /// Opens (or creates) the session store at the given path.
    pub fn open(db_path: &Path, config: SessionConfig) -> SessionResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(Arc::new(Mutex::new(conn)), config)
    }

    /// Opens an in-memory session store (for testing).
    pub fn open_in_memory(config: SessionConfig) -> SessionResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(Arc::new(Mutex::new(conn)), config)
    }

    /// Builds an authority over an existing shared connection.
    pub fn with_connection(
        conn: Arc<Mutex<Connection>>,
        config: SessionConfig,
    ) -> SessionResult<Self> {
        let encoding_key = EncodingKey::from_secret(&config.secret);
        let decoding_key = DecodingKey::from_secret(&config.secret);
        let authority = Self {
            conn,
            config,
            encoding_key,
            decoding_key,
        };
        authority.ensure_tables()?;
        Ok(authority)
    }

    /// The underlying connection, for stores that share the same database
    /// (the access ledger reads the `users` table for recipient lookups).
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn ensure_tables(&self) -> SessionResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE SEQUENCE IF NOT EXISTS user_id_seq;
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY DEFAULT nextval('user_id_seq'),
                name VARCHAR NOT NULL,
                email VARCHAR NOT NULL UNIQUE,
                password_hash VARCHAR NOT NULL,
                public_key VARCHAR UNIQUE,
                created_at BIGINT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS refresh_credentials (
                token VARCHAR PRIMARY KEY,
                user_id BIGINT NOT NULL,
                expires_at BIGINT NOT NULL
            );",
        )?;
        Ok(())
    }

    // ── Registration & login ──

    /// Creates a user and opens their first session.
    ///
    /// The public key, when provided, is the user's permanent sharing
    /// address — it can also be set once later via
    /// [`set_public_key`](Self::set_public_key), but never changed.
    pub fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        public_key: Option<&str>,
    ) -> SessionResult<AuthResponse> {
        if password.len() < 8 {
            return Err(SessionError::WeakPassword);
        }

        let password_hash = self.hash_password(password)?;
        let now = Utc::now();

        let user = {
            let conn = self.conn.lock().unwrap();

            let email_taken: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE email = ?",
                params![email],
                |row| row.get(0),
            )?;
            if email_taken > 0 {
                return Err(SessionError::EmailTaken);
            }

            if let Some(pk) = public_key {
                let key_taken: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM users WHERE public_key = ?",
                    params![pk],
                    |row| row.get(0),
                )?;
                if key_taken > 0 {
                    return Err(SessionError::PublicKeyTaken);
                }
            }

            let id: i64 = conn.query_row(
                "INSERT INTO users (name, email, password_hash, public_key, created_at)
                 VALUES (?, ?, ?, ?, ?) RETURNING id",
                params![name, email, password_hash, public_key, now.timestamp_millis()],
                |row| row.get(0),
            )?;

            UserIdentity {
                id,
                name: name.to_string(),
                email: email.to_string(),
                public_key: public_key.map(str::to_string),
                created_at: now,
            }
        };

        info!("registered user {} ({})", user.id, user.email);
        self.issue(&user)
    }

    /// Verifies the password and opens a session. Unknown email and wrong
    /// password are indistinguishable to the caller.
    pub fn login(&self, email: &str, password: &str) -> SessionResult<AuthResponse> {
        let (user, password_hash) = {
            let conn = self.conn.lock().unwrap();
            let row = conn.query_row(
                "SELECT id, name, email, public_key, password_hash, created_at
                 FROM users WHERE email = ?",
                params![email],
                |row| {
                    Ok((
                        Self::user_from_parts(
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(5)?,
                        ),
                        row.get::<_, String>(4)?,
                    ))
                },
            );
            match row {
                Ok(v) => v,
                Err(duckdb::Error::QueryReturnedNoRows) => {
                    return Err(SessionError::InvalidCredentials)
                }
                Err(e) => return Err(e.into()),
            }
        };

        self.verify_password(password, &password_hash)?;

        debug!("login for user {}", user.id);
        self.issue(&user)
    }

    // ── Credential lifecycle ──

    /// Validates an access credential by signature and expiry, returning its
    /// claims. No server-side state is consulted — the short lifetime is the
    /// revocation mechanism.
    pub fn authorize(&self, access_credential: &str) -> SessionResult<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        jsonwebtoken::decode::<AccessClaims>(access_credential, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(map_decode_error)
    }

    /// Rotates a refresh credential: the presented credential is consumed
    /// and a replacement issued in the same transaction.
    ///
    /// A credential that was already rotated fails with
    /// [`SessionError::CredentialReplay`]: two valid credentials never exist
    /// for one logical session, and reuse is a hijack signal the caller must
    /// answer with a full re-login, never an automatic retry. The successor
    /// credential from the legitimate rotation is unaffected.
    pub fn refresh(&self, refresh_credential: &str) -> SessionResult<AuthResponse> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let claims =
            jsonwebtoken::decode::<RefreshClaims>(refresh_credential, &self.decoding_key, &validation)
                .map(|data| data.claims)
                .map_err(map_decode_error)?;

        let now = Utc::now();
        let new_exp = now.timestamp() + self.config.refresh_ttl_secs;
        let new_refresh = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(Algorithm::HS256),
            &RefreshClaims {
                id: claims.id,
                email: claims.email.clone(),
                jti: Uuid::new_v4().to_string(),
                exp: new_exp,
            },
            &self.encoding_key,
        )?;

        enum Outcome {
            Rotated(UserIdentity),
            Replayed,
        }

        let outcome = {
            let conn = self.conn.lock().unwrap();
            conn.execute_batch("BEGIN TRANSACTION;")?;

            let result = (|| -> SessionResult<Outcome> {
                // The affected-row count of this delete is the atomic
                // consume: under the serialized connection only one caller
                // can see 1 here for a given credential.
                let consumed = conn.execute(
                    "DELETE FROM refresh_credentials WHERE token = ?",
                    params![refresh_credential],
                )?;
                if consumed == 0 {
                    // Already rotated. The successor credential stays valid;
                    // the caller holding this stale one must re-authenticate.
                    warn!(
                        "rotated refresh credential reused for user {} (possible replay)",
                        claims.id
                    );
                    return Ok(Outcome::Replayed);
                }

                conn.execute(
                    "INSERT INTO refresh_credentials (token, user_id, expires_at) VALUES (?, ?, ?)",
                    params![new_refresh, claims.id, new_exp * 1000],
                )?;

                let user = Self::user_row(&conn, claims.id)?;
                Ok(Outcome::Rotated(user))
            })();

            match result {
                Ok(outcome) => {
                    conn.execute_batch("COMMIT;")?;
                    outcome
                }
                Err(e) => {
                    let _ = conn.execute_batch("ROLLBACK;");
                    return Err(e);
                }
            }
        };

        match outcome {
            Outcome::Replayed => Err(SessionError::CredentialReplay),
            Outcome::Rotated(user) => {
                debug!("rotated refresh credential for user {}", user.id);
                let access_credential = self.encode_access(&user)?;
                Ok(AuthResponse {
                    access_credential,
                    refresh_credential: new_refresh,
                    user,
                })
            }
        }
    }

    /// Deletes the matching refresh credential. Idempotent — logging out
    /// with an unknown credential is still a successful logout.
    pub fn logout(&self, refresh_credential: &str) -> SessionResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM refresh_credentials WHERE token = ?",
            params![refresh_credential],
        )?;
        Ok(())
    }

    /// Revokes every refresh credential for a user (logout on all devices).
    pub fn logout_all(&self, user_id: i64) -> SessionResult<usize> {
        let conn = self.conn.lock().unwrap();
        let revoked = conn.execute(
            "DELETE FROM refresh_credentials WHERE user_id = ?",
            params![user_id],
        )?;
        info!("revoked {revoked} session(s) for user {user_id}");
        Ok(revoked)
    }

    /// Maintenance: drops refresh credentials past their expiry.
    pub fn purge_expired(&self) -> SessionResult<usize> {
        let conn = self.conn.lock().unwrap();
        let purged = conn.execute(
            "DELETE FROM refresh_credentials WHERE expires_at < ?",
            params![Utc::now().timestamp_millis()],
        )?;
        Ok(purged)
    }

    // ── Directory lookups ──

    pub fn email_exists(&self, email: &str) -> SessionResult<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn find_by_email(&self, email: &str) -> SessionResult<Option<UserIdentity>> {
        let conn = self.conn.lock().unwrap();
        Self::optional_user(conn.query_row(
            "SELECT id, name, email, public_key, created_at FROM users WHERE email = ?",
            params![email],
            Self::map_user_row,
        ))
    }

    pub fn find_by_public_key(&self, public_key: &str) -> SessionResult<Option<UserIdentity>> {
        let conn = self.conn.lock().unwrap();
        Self::optional_user(conn.query_row(
            "SELECT id, name, email, public_key, created_at FROM users WHERE public_key = ?",
            params![public_key],
            Self::map_user_row,
        ))
    }

    pub fn user_by_id(&self, user_id: i64) -> SessionResult<UserIdentity> {
        let conn = self.conn.lock().unwrap();
        Self::user_row(&conn, user_id)
    }

    /// Registers the user's public key after the fact. Allowed exactly once;
    /// rotating a key would orphan every content key wrapped under the old
    /// one, so there is deliberately no update path.
    pub fn set_public_key(&self, user_id: i64, public_key: &str) -> SessionResult<()> {
        let conn = self.conn.lock().unwrap();

        let existing: Option<String> = match conn.query_row(
            "SELECT public_key FROM users WHERE id = ?",
            params![user_id],
            |row| row.get(0),
        ) {
            Ok(v) => v,
            Err(duckdb::Error::QueryReturnedNoRows) => {
                return Err(SessionError::UserNotFound(user_id))
            }
            Err(e) => return Err(e.into()),
        };
        if existing.is_some() {
            return Err(SessionError::PublicKeyAlreadySet);
        }

        let key_taken: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE public_key = ?",
            params![public_key],
            |row| row.get(0),
        )?;
        if key_taken > 0 {
            return Err(SessionError::PublicKeyTaken);
        }

        conn.execute(
            "UPDATE users SET public_key = ? WHERE id = ?",
            params![public_key, user_id],
        )?;
        info!("public key registered for user {user_id}");
        Ok(())
    }

    // ── Internals ──

    fn issue(&self, user: &UserIdentity) -> SessionResult<AuthResponse> {
        let now = Utc::now().timestamp();
        let refresh_exp = now + self.config.refresh_ttl_secs;

        let refresh_credential = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(Algorithm::HS256),
            &RefreshClaims {
                id: user.id,
                email: user.email.clone(),
                jti: Uuid::new_v4().to_string(),
                exp: refresh_exp,
            },
            &self.encoding_key,
        )?;

        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO refresh_credentials (token, user_id, expires_at) VALUES (?, ?, ?)",
                params![refresh_credential, user.id, refresh_exp * 1000],
            )?;
        }

        let access_credential = self.encode_access(user)?;
        Ok(AuthResponse {
            access_credential,
            refresh_credential,
            user: user.clone(),
        })
    }

    fn encode_access(&self, user: &UserIdentity) -> SessionResult<String> {
        let claims = AccessClaims {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            exp: Utc::now().timestamp() + self.config.access_ttl_secs,
        };
        Ok(jsonwebtoken::encode(
            &jsonwebtoken::Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    fn hash_password(&self, password: &str) -> SessionResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| SessionError::PasswordHash(e.to_string()))
    }

    fn verify_password(&self, password: &str, stored: &str) -> SessionResult<()> {
        let parsed =
            PasswordHash::new(stored).map_err(|e| SessionError::PasswordHash(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| SessionError::InvalidCredentials)
    }

    fn user_row(conn: &Connection, user_id: i64) -> SessionResult<UserIdentity> {
        match conn.query_row(
            "SELECT id, name, email, public_key, created_at FROM users WHERE id = ?",
            params![user_id],
            Self::map_user_row,
        ) {
            Ok(user) => Ok(user),
            Err(duckdb::Error::QueryReturnedNoRows) => Err(SessionError::UserNotFound(user_id)),
            Err(e) => Err(e.into()),
        }
    }

    fn map_user_row(row: &duckdb::Row<'_>) -> Result<UserIdentity, duckdb::Error> {
        Ok(Self::user_from_parts(
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
        ))
    }

    fn user_from_parts(
        id: i64,
        name: String,
        email: String,
        public_key: Option<String>,
        created_at_ms: i64,
    ) -> UserIdentity {
        UserIdentity {
            id,
            name,
            email,
            public_key,
            created_at: DateTime::from_timestamp_millis(created_at_ms).unwrap_or_default(),
        }
    }

    fn optional_user(
        row: Result<UserIdentity, duckdb::Error>,
    ) -> SessionResult<Option<UserIdentity>> {
        match row {
            Ok(user) => Ok(Some(user)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> SessionError {
    match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::CredentialExpired,
        _ => SessionError::CredentialInvalid(e.to_string()),
    }
}
