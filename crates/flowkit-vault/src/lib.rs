//! Encrypted credential record store for flowkit.
//!
//! This crate persists credential records keyed by (name, type). Field data
//! is encrypted at rest with AES-256-GCM under a process-wide master key;
//! the database bootstraps itself lazily on first use with single-flight
//! semantics, so concurrent first callers share one initialization.
//!
//! # Modules
//!
//! - [`crypto`] — AES-256-GCM encryption/decryption, PBKDF2 key derivation.
//! - [`store`] — SQLite-backed record CRUD keyed by (name, type).
//! - [`error`] — unified error types.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use flowkit_vault::crypto;
//! use flowkit_vault::store::{CredentialStore, NodeAccess};
//!
//! # async fn example() -> flowkit_vault::error::Result<()> {
//! let master_key = crypto::generate_key()?;
//! let store = CredentialStore::new("data/credentials.db", &master_key);
//!
//! let mut fields = serde_json::Map::new();
//! fields.insert("api_key".into(), serde_json::json!("sk-..."));
//!
//! store
//!     .save("work account", "service_api", &[NodeAccess::new("http_request")], &fields)
//!     .await?;
//!
//! let record = store.load("work account", "service_api").await?;
//! let decrypted = store.decrypt(&record)?;
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod error;
pub mod store;

// Re-export the most commonly used types at the crate root for convenience.
pub use error::{Result, VaultError};
pub use store::{CredentialRecord, CredentialStore, CredentialSummary, DecryptedData, NodeAccess};
