//! Linked-account credentials and their SQLite-backed store.
//!
//! A credential ties a store to the blog account that publishes for it.
//! The secret is sealed by [`crate::crypto`] before it ever reaches the
//! store; this module never sees plaintext.
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;

use scribe_common::{Platform, Result, ScribeError};

/// One linked account. `platform` is stored but not consulted by the
/// publish workflow; it exists so future platforms can share the table.
#[derive(Debug, Clone)]
pub struct Credential {
    pub store_id: i64,
    pub login_id: String,
    /// Sealed secret as produced by a [`crate::crypto::SecretCipher`].
    pub secret_enc: String,
    pub platform: Platform,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Credential {
    /// Convenience constructor stamping both timestamps with now.
    pub fn new(store_id: i64, login_id: String, secret_enc: String, platform: Platform) -> Self {
        let now = Utc::now();
        Self {
            store_id,
            login_id,
            secret_enc,
            platform,
            created_at: now,
            modified_at: now,
        }
    }
}

/// Lookup and linking of credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// The credential linked to `store_id`, if any.
    async fn find_by_store(&self, store_id: i64) -> Result<Option<Credential>>;

    /// Link a new credential. Fails if the login id is already linked.
    async fn insert(&self, credential: &Credential) -> Result<()>;
}

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS credentials (
    store_id    INTEGER NOT NULL,
    login_id    TEXT PRIMARY KEY,
    secret_enc  TEXT NOT NULL,
    platform    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    modified_at TEXT NOT NULL
)";

/// SQLite implementation of [`CredentialStore`].
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    /// Open (and bootstrap) the store at `database_url`, e.g.
    /// `sqlite://scribe.db` or `sqlite::memory:`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| ScribeError::Storage(format!("bad database url: {e}")))?
            .create_if_missing(true);
        // A single pinned connection: in-memory databases live and die with
        // their connection, and credential traffic is tiny anyway.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| ScribeError::Storage(format!("failed to open store: {e}")))?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| ScribeError::Storage(format!("schema bootstrap failed: {e}")))?;

        Ok(Self { pool })
    }
}

fn row_to_credential(row: &sqlx::sqlite::SqliteRow) -> Result<Credential> {
    let platform: String = row
        .try_get("platform")
        .map_err(|e| ScribeError::Storage(e.to_string()))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| ScribeError::Storage(e.to_string()))?;
    let modified_at: String = row
        .try_get("modified_at")
        .map_err(|e| ScribeError::Storage(e.to_string()))?;

    Ok(Credential {
        store_id: row
            .try_get("store_id")
            .map_err(|e| ScribeError::Storage(e.to_string()))?,
        login_id: row
            .try_get("login_id")
            .map_err(|e| ScribeError::Storage(e.to_string()))?,
        secret_enc: row
            .try_get("secret_enc")
            .map_err(|e| ScribeError::Storage(e.to_string()))?,
        platform: platform.parse()?,
        created_at: parse_timestamp(&created_at)?,
        modified_at: parse_timestamp(&modified_at)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ScribeError::Storage(format!("bad timestamp {raw:?}: {e}")))
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn find_by_store(&self, store_id: i64) -> Result<Option<Credential>> {
        let row = sqlx::query(
            "SELECT store_id, login_id, secret_enc, platform, created_at, modified_at \
             FROM credentials WHERE store_id = ? LIMIT 1",
        )
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ScribeError::Storage(e.to_string()))?;

        row.as_ref().map(row_to_credential).transpose()
    }

    async fn insert(&self, credential: &Credential) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO credentials \
             (store_id, login_id, secret_enc, platform, created_at, modified_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(credential.store_id)
        .bind(&credential.login_id)
        .bind(&credential.secret_enc)
        .bind(credential.platform.as_str())
        .bind(credential.created_at.to_rfc3339())
        .bind(credential.modified_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!(
                    target: "store.link",
                    store_id = credential.store_id,
                    platform = %credential.platform,
                    "credential linked"
                );
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                ScribeError::Storage(format!("login id {:?} is already linked", credential.login_id)),
            ),
            Err(e) => Err(ScribeError::Storage(e.to_string())),
        }
    }
}
