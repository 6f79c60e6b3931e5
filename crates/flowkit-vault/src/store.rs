//! SQLite-backed encrypted credential record store.
//!
//! [`CredentialStore`] persists one row per (name, type) pair: the
//! AES-256-GCM ciphertext of the credential's field map, the nonce it was
//! sealed with, the connector access list, and created/updated timestamps.
//! Plaintext only exists in memory, inside the resolution operation that
//! asked for it.
//!
//! The underlying database is opened lazily on first use. Initialization is
//! single-flight: concurrent first callers all await one bootstrap instead
//! of racing to open and migrate the database independently
//! (`tokio::sync::OnceCell`). All SQL runs on the blocking thread pool via
//! `tokio::task::spawn_blocking`, so async callers never block a runtime
//! worker on file I/O.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::crypto;
use crate::error::{Result, VaultError};

/// Decrypted credential field map, as handed to the resolution pipeline.
///
/// Keeps insertion order, so the defaults applier can emit fields in schema
/// order and carried-over fields after them.
pub type DecryptedData = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An access-scope entry: which connector node kind may use a credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAccess {
    /// Connector node type name (e.g. `http_request`, `jira`).
    pub node_type: String,
    /// When access was granted.
    pub granted_at: Option<DateTime<Utc>>,
}

impl NodeAccess {
    /// Grant access to a node type, stamped now.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            granted_at: Some(Utc::now()),
        }
    }
}

/// A persisted credential record. The field map is present only as
/// ciphertext; use [`CredentialStore::decrypt`] to recover the plaintext.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    /// User-chosen credential name.
    pub name: String,
    /// Credential type name (see `flowkit-schema`).
    pub type_name: String,
    /// Connector node kinds allowed to use this credential.
    pub nodes_access: Vec<NodeAccess>,
    /// AES-256-GCM ciphertext of the JSON-serialized field map.
    pub ciphertext: Vec<u8>,
    /// Nonce the ciphertext was sealed with.
    pub nonce: Vec<u8>,
    /// When this record was first saved.
    pub created_at: DateTime<Utc>,
    /// When this record was last written.
    pub updated_at: DateTime<Utc>,
}

/// Listing entry for a stored credential; no ciphertext, no decryption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSummary {
    pub name: String,
    pub type_name: String,
    pub nodes_access: Vec<NodeAccess>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Database handle
// ---------------------------------------------------------------------------

/// Thread-safe SQLite handle; all access goes through [`Database::call`]
/// which dispatches onto the blocking thread pool.
#[derive(Clone)]
struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    fn open(path: &std::path::Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "opening credential store database");
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn open_in_memory() -> Result<Self> {
        tracing::debug!("opening in-memory credential store database");
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA temp_store = MEMORY;",
        )?;
        Ok(())
    }

    fn migrate(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS credentials (
                name         TEXT NOT NULL,
                type         TEXT NOT NULL,
                data         BLOB NOT NULL,
                nonce        BLOB NOT NULL,
                nodes_access TEXT NOT NULL DEFAULT '[]',
                created_at   INTEGER NOT NULL,
                updated_at   INTEGER NOT NULL,
                PRIMARY KEY (name, type)
            );",
        )
        .map_err(|e| VaultError::MigrationFailed {
            reason: e.to_string(),
        })?;

        tracing::debug!("credential store schema ready");
        Ok(())
    }

    /// Run a closure against the connection on the blocking pool. The
    /// single connection behind the mutex serializes all writes, so
    /// concurrent saves of the same (name, type) pair are last-writer-wins.
    async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| VaultError::TaskJoin(format!("mutex poisoned: {e}")))?;
            f(&conn)
        })
        .await?
    }
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

/// Where the store keeps its database.
enum Backend {
    File(PathBuf),
    InMemory,
}

struct StoreInner {
    backend: Backend,
    master_key: Vec<u8>,
    db: OnceCell<Database>,
}

/// Encrypted credential store keyed by (name, type).
///
/// Cheaply cloneable; clones share the same lazily-opened database and the
/// same process-wide master key.
///
/// # Example
///
/// ```rust,no_run
/// # use flowkit_vault::store::CredentialStore;
/// # async fn example() -> flowkit_vault::error::Result<()> {
/// # let master_key = [0u8; 32];
/// let store = CredentialStore::new("data/credentials.db", &master_key);
///
/// let mut fields = serde_json::Map::new();
/// fields.insert("api_key".into(), serde_json::json!("sk-test"));
/// store.save("work account", "service_api", &[], &fields).await?;
///
/// let record = store.load("work account", "service_api").await?;
/// let decrypted = store.decrypt(&record)?;
/// assert_eq!(decrypted["api_key"], "sk-test");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<StoreInner>,
}

impl CredentialStore {
    /// Create a store backed by a database file at `path`.
    ///
    /// No I/O happens here; the database is opened and migrated on first
    /// use.
    pub fn new(path: impl Into<PathBuf>, master_key: &[u8]) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend: Backend::File(path.into()),
                master_key: master_key.to_vec(),
                db: OnceCell::new(),
            }),
        }
    }

    /// Create a store backed by an in-memory database — useful for tests.
    pub fn in_memory(master_key: &[u8]) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend: Backend::InMemory,
                master_key: master_key.to_vec(),
                db: OnceCell::new(),
            }),
        }
    }

    /// Get the database, bootstrapping it exactly once. Concurrent first
    /// callers all await the same initialization.
    async fn db(&self) -> Result<&Database> {
        self.inner
            .db
            .get_or_try_init(|| async {
                match &self.inner.backend {
                    Backend::File(path) => {
                        let path = path.clone();
                        tokio::task::spawn_blocking(move || Database::open(&path)).await?
                    }
                    Backend::InMemory => Database::open_in_memory(),
                }
            })
            .await
    }

    /// Load the record for the (name, type) pair.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::CredentialNotFound`] when no record matches
    /// both name and type.
    pub async fn load(&self, name: &str, type_name: &str) -> Result<CredentialRecord> {
        let db = self.db().await?;
        let (name, type_name) = (name.to_string(), type_name.to_string());

        db.call(move |conn| {
            let row = conn
                .query_row(
                    "SELECT name, type, data, nonce, nodes_access, created_at, updated_at
                     FROM credentials WHERE name = ?1 AND type = ?2",
                    params![name, type_name],
                    |row| {
                        Ok(RawRow {
                            name: row.get(0)?,
                            type_name: row.get(1)?,
                            data: row.get(2)?,
                            nonce: row.get(3)?,
                            nodes_access: row.get(4)?,
                            created_at: row.get(5)?,
                            updated_at: row.get(6)?,
                        })
                    },
                )
                .optional()?;

            let row = row.ok_or(VaultError::CredentialNotFound {
                name: name.clone(),
                type_name: type_name.clone(),
            })?;

            row.into_record()
        })
        .await
    }

    /// Encrypt `plaintext` and upsert the record for (name, type) in one
    /// logical step.
    ///
    /// A fresh nonce is used for every write. `updated_at` is stamped with
    /// the current time; `created_at` is preserved when the record already
    /// exists. The single INSERT .. ON CONFLICT statement means a reader
    /// never observes a half-written record, and retrying after a transient
    /// failure is safe.
    pub async fn save(
        &self,
        name: &str,
        type_name: &str,
        nodes_access: &[NodeAccess],
        plaintext: &DecryptedData,
    ) -> Result<()> {
        let payload = serde_json::to_vec(&serde_json::Value::Object(plaintext.clone()))?;
        let (nonce, ciphertext) = crypto::encrypt(&payload, &self.inner.master_key)?;
        let access_json = serde_json::to_string(nodes_access)?;
        let now = Utc::now().timestamp();

        let db = self.db().await?;
        let (name_owned, type_owned) = (name.to_string(), type_name.to_string());

        db.call(move |conn| {
            conn.execute(
                "INSERT INTO credentials (name, type, data, nonce, nodes_access, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(name, type) DO UPDATE SET
                     data = excluded.data,
                     nonce = excluded.nonce,
                     nodes_access = excluded.nodes_access,
                     updated_at = excluded.updated_at",
                params![
                    name_owned,
                    type_owned,
                    ciphertext,
                    nonce.as_slice(),
                    access_json,
                    now,
                ],
            )?;
            Ok(())
        })
        .await?;

        tracing::info!(name = %name, type_name = %type_name, "saved credential record");
        Ok(())
    }

    /// Delete the record for (name, type).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::CredentialNotFound`] if no record matches.
    pub async fn delete(&self, name: &str, type_name: &str) -> Result<()> {
        let db = self.db().await?;
        let (name_owned, type_owned) = (name.to_string(), type_name.to_string());

        db.call(move |conn| {
            let rows = conn.execute(
                "DELETE FROM credentials WHERE name = ?1 AND type = ?2",
                params![name_owned, type_owned],
            )?;
            if rows == 0 {
                return Err(VaultError::CredentialNotFound {
                    name: name_owned,
                    type_name: type_owned,
                });
            }
            Ok(())
        })
        .await?;

        tracing::info!(name = %name, type_name = %type_name, "deleted credential record");
        Ok(())
    }

    /// List all stored records without decrypting anything.
    pub async fn list(&self) -> Result<Vec<CredentialSummary>> {
        let db = self.db().await?;

        db.call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name, type, nodes_access, created_at, updated_at
                 FROM credentials ORDER BY type, name",
            )?;

            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?;

            let mut summaries = Vec::new();
            for row in rows {
                let (name, type_name, access_json, created_at, updated_at) = row?;
                summaries.push(CredentialSummary {
                    name,
                    type_name,
                    nodes_access: serde_json::from_str(&access_json)?,
                    created_at: timestamp(created_at),
                    updated_at: timestamp(updated_at),
                });
            }

            tracing::debug!(count = summaries.len(), "listed credential records");
            Ok(summaries)
        })
        .await
    }

    /// Decrypt a loaded record into its field map.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::DecryptionFailed`] if the master key does not
    /// match or the ciphertext is corrupt, and [`VaultError::MalformedData`]
    /// if the plaintext is valid but not a JSON object.
    pub fn decrypt(&self, record: &CredentialRecord) -> Result<DecryptedData> {
        if record.nonce.len() != crypto::NONCE_LEN_BYTES {
            return Err(VaultError::DecryptionFailed {
                reason: format!(
                    "stored nonce is {} bytes, expected {}",
                    record.nonce.len(),
                    crypto::NONCE_LEN_BYTES
                ),
            });
        }
        let mut nonce = [0u8; crypto::NONCE_LEN_BYTES];
        nonce.copy_from_slice(&record.nonce);

        let plaintext = crypto::decrypt(&nonce, &record.ciphertext, &self.inner.master_key)?;
        match serde_json::from_slice(&plaintext)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(VaultError::MalformedData {
                name: record.name.clone(),
                type_name: record.type_name.clone(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal row type (avoid leaking rusqlite details)
// ---------------------------------------------------------------------------

struct RawRow {
    name: String,
    type_name: String,
    data: Vec<u8>,
    nonce: Vec<u8>,
    nodes_access: String,
    created_at: i64,
    updated_at: i64,
}

impl RawRow {
    fn into_record(self) -> Result<CredentialRecord> {
        Ok(CredentialRecord {
            name: self.name,
            type_name: self.type_name,
            nodes_access: serde_json::from_str(&self.nodes_access)?,
            ciphertext: self.data,
            nonce: self.nonce,
            created_at: timestamp(self.created_at),
            updated_at: timestamp(self.updated_at),
        })
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
