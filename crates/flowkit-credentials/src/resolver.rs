//! Credential resolution facade.
//!
//! [`CredentialResolver`] orchestrates the whole pipeline: load and decrypt
//! the stored record, fill schema defaults, resolve embedded expressions,
//! and apply administrator overwrites — in that order, with overwrites
//! always last. The write path is the inverse and deliberately narrower:
//! re-encrypt and upsert, with none of the read-time transformations.
//!
//! All collaborators (type registry, store, overwrite set) are constructed
//! by the embedding process and injected here, so tests can substitute
//! fixtures without touching process-wide state.

use flowkit_schema::{CredentialTypeRegistry, CredentialTypeSchema};
use flowkit_vault::{CredentialStore, CredentialSummary, DecryptedData, NodeAccess, VaultError};

use crate::defaults::apply_defaults;
use crate::error::Result;
use crate::overwrites::CredentialOverwrites;

/// Reserved field carrying OAuth token material.
///
/// Never part of any schema; when present in the stored data it must
/// survive the whole pipeline byte-identical, even if its content happens
/// to look like an expression.
pub const OAUTH_TOKEN_DATA_KEY: &str = "oauthTokenData";

/// Facade over the credential resolution pipeline.
///
/// # Example
///
/// ```rust,no_run
/// # use flowkit_credentials::{CredentialResolver, CredentialOverwrites};
/// # use flowkit_schema::CredentialTypeRegistry;
/// # use flowkit_vault::CredentialStore;
/// # async fn example() -> flowkit_credentials::Result<()> {
/// # let master_key = [0u8; 32];
/// let registry = CredentialTypeRegistry::new();
/// // ... register credential type schemas ...
/// let store = CredentialStore::new("data/credentials.db", &master_key);
/// let overwrites = CredentialOverwrites::from_toml_file("config/overwrites.toml")?;
///
/// let resolver = CredentialResolver::new(registry, store, overwrites);
/// let data = resolver.resolve("work account", "service_api", false).await?;
/// # Ok(())
/// # }
/// ```
pub struct CredentialResolver {
    registry: CredentialTypeRegistry,
    store: CredentialStore,
    overwrites: CredentialOverwrites,
}

impl CredentialResolver {
    /// Build a resolver from its injected collaborators.
    pub fn new(
        registry: CredentialTypeRegistry,
        store: CredentialStore,
        overwrites: CredentialOverwrites,
    ) -> Self {
        Self {
            registry,
            store,
            overwrites,
        }
    }

    /// The full merged schema for a credential type — the only schema
    /// operation connector code needs.
    pub fn merged_schema(&self, type_name: &str) -> Result<CredentialTypeSchema> {
        Ok(self.registry.get_merged(type_name)?)
    }

    /// Resolve the credential identified by (name, type) into the
    /// plaintext value set a connector authenticates with.
    ///
    /// With `raw == true` the decrypted data is returned exactly as
    /// persisted — no defaults, no expression resolution, no overwrites;
    /// the path export/debug tooling uses. Otherwise the pipeline runs:
    /// merged schema → defaults → expressions → overwrites, with
    /// [`OAUTH_TOKEN_DATA_KEY`] carried through verbatim.
    ///
    /// # Errors
    ///
    /// - [`VaultError::CredentialNotFound`] — no record for (name, type).
    /// - [`VaultError::DecryptionFailed`] — wrong key or corrupt data;
    ///   not retryable.
    /// - [`flowkit_schema::SchemaError::UnknownType`] /
    ///   [`flowkit_schema::SchemaError::CyclicInheritance`] — schema merge
    ///   failure (non-raw path only).
    /// - [`CredentialsError::Expression`](crate::CredentialsError::Expression)
    ///   — an embedded expression failed; the whole resolution aborts,
    ///   no partial data is returned.
    pub async fn resolve(&self, name: &str, type_name: &str, raw: bool) -> Result<DecryptedData> {
        let record = self.store.load(name, type_name).await?;
        let decrypted = self.store.decrypt(&record)?;

        if raw {
            tracing::debug!(name = %name, type_name = %type_name, "resolved credential (raw)");
            return Ok(decrypted);
        }

        let schema = self.registry.get_merged(type_name)?;
        let mut working = apply_defaults(&decrypted, &schema);

        // The reserved token entry stays referenceable from expressions but
        // is never itself resolved; the stored bytes are re-attached below.
        let oauth_token = working.shift_remove(OAUTH_TOKEN_DATA_KEY);
        let context = match &oauth_token {
            Some(token) => {
                let mut ctx = working.clone();
                ctx.insert(OAUTH_TOKEN_DATA_KEY.to_string(), token.clone());
                ctx
            }
            None => working.clone(),
        };

        let mut resolved = flowkit_expression::resolve_map_with_context(&working, &context)?;

        if let Some(token) = oauth_token {
            resolved.insert(OAUTH_TOKEN_DATA_KEY.to_string(), token);
        }

        let resolved = self.overwrites.apply(type_name, resolved);

        tracing::debug!(
            name = %name,
            type_name = %type_name,
            field_count = resolved.len(),
            "resolved credential"
        );
        Ok(resolved)
    }

    /// Re-encrypt `data` and write it back under (name, type) with a
    /// refreshed `updated_at`.
    ///
    /// An existing record keeps its access list and creation timestamp; a
    /// missing one is created with no access entries, keeping the write an
    /// idempotent upsert that is safe to retry. None of the read-time
    /// transformations (defaults, expressions, overwrites) run here.
    pub async fn persist(&self, name: &str, type_name: &str, data: &DecryptedData) -> Result<()> {
        let nodes_access = match self.store.load(name, type_name).await {
            Ok(record) => record.nodes_access,
            Err(VaultError::CredentialNotFound { .. }) => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        self.store.save(name, type_name, &nodes_access, data).await?;
        Ok(())
    }

    /// First save of a credential, carrying the connector access scopes it
    /// is granted to.
    pub async fn create(
        &self,
        name: &str,
        type_name: &str,
        nodes_access: &[NodeAccess],
        data: &DecryptedData,
    ) -> Result<()> {
        self.store.save(name, type_name, nodes_access, data).await?;
        Ok(())
    }

    /// Remove the record for (name, type).
    pub async fn delete(&self, name: &str, type_name: &str) -> Result<()> {
        self.store.delete(name, type_name).await?;
        Ok(())
    }

    /// List stored credentials without decrypting anything.
    pub async fn list(&self) -> Result<Vec<CredentialSummary>> {
        Ok(self.store.list().await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
