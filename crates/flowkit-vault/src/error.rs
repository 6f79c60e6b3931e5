//! Vault error types.
//!
//! Every public API in this crate returns [`VaultError`]. Variants carry the
//! offending name/type so callers can react without parsing message strings.
//! The [`Database`](VaultError::Database) and [`Io`](VaultError::Io)
//! variants are the transient persistence-failure class: writes are
//! idempotent upserts, so retrying them is safe.
//! [`DecryptionFailed`](VaultError::DecryptionFailed) is not retryable: the
//! key is wrong or the ciphertext is corrupt, and repeating the call cannot
//! help without key correction.

/// Unified error type for the flowkit credential store.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    // -- Crypto errors ------------------------------------------------------
    /// Encryption failed (invalid key length, RNG failure).
    #[error("encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    /// Decryption failed: wrong master key, corrupted ciphertext, or a
    /// malformed stored nonce. Non-retryable.
    #[error("decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    // -- Store errors -------------------------------------------------------
    /// No record exists for this (name, type) pair. The same name stored
    /// under a different type does not match.
    #[error("credential not found: name={name}, type={type_name}")]
    CredentialNotFound { name: String, type_name: String },

    /// Database schema migration failed during lazy store initialization.
    #[error("migration failed: {reason}")]
    MigrationFailed { reason: String },

    /// The decrypted plaintext was not a JSON object.
    #[error("stored credential data is not an object: name={name}, type={type_name}")]
    MalformedData { name: String, type_name: String },

    // -- Underlying errors --------------------------------------------------
    /// SQLite error from `rusqlite`. Transient; safe to retry.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error from the filesystem. Transient; safe to retry.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking database task failed to complete.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for VaultError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}

/// Convenience alias used throughout the vault crate.
pub type Result<T> = std::result::Result<T, VaultError>;
