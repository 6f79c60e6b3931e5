//! Administrator-configured credential overwrites.
//!
//! An overwrite forces a field value for every credential of a given type,
//! no matter what the stored record, default filling, or expression
//! resolution produced — the operator's way to pin an endpoint or inject a
//! site-wide secret. The set is loaded once at process start (from a TOML
//! file or a JSON value), kept separate from per-record data, and applied
//! as the final, unconditional step of resolution.
//!
//! ```toml
//! # config/overwrites.toml
//! [overwrites.service_api]
//! host = "internal.example.local"
//!
//! [overwrites.github_api]
//! server = "https://github.internal"
//! ```

use std::collections::HashMap;
use std::path::Path;

use flowkit_vault::DecryptedData;
use serde_json::Value;

use crate::error::{CredentialsError, Result};

/// Read-only mapping from credential type name to forced field values.
#[derive(Debug, Clone, Default)]
pub struct CredentialOverwrites {
    inner: HashMap<String, DecryptedData>,
}

impl CredentialOverwrites {
    /// An empty overwrite set — every apply is a no-op.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an overwrite set from a JSON value shaped like
    /// `{ "<type>": { "<field>": <value>, ... }, ... }`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::OverwriteConfig`] if the value or any
    /// per-type entry is not an object.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(types) = value else {
            return Err(CredentialsError::OverwriteConfig {
                reason: "top level must be an object keyed by credential type".into(),
            });
        };

        let mut inner = HashMap::with_capacity(types.len());
        for (type_name, fields) in types {
            let Value::Object(fields) = fields else {
                return Err(CredentialsError::OverwriteConfig {
                    reason: format!("entry for type `{type_name}` must be an object"),
                });
            };
            inner.insert(type_name, fields);
        }

        Ok(Self { inner })
    }

    /// Load the `[overwrites]` tables from a TOML config file.
    ///
    /// A file without an `[overwrites]` table yields an empty set — the
    /// file may carry unrelated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::OverwriteConfig`] if the file cannot be
    /// read or parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| CredentialsError::OverwriteConfig {
                reason: format!("cannot read {}: {e}", path.display()),
            })?;

        let table: toml::Table =
            content
                .parse()
                .map_err(|e: toml::de::Error| CredentialsError::OverwriteConfig {
                    reason: format!("cannot parse {}: {e}", path.display()),
                })?;

        let Some(overwrites) = table.get("overwrites") else {
            tracing::debug!(path = %path.display(), "no [overwrites] table in config");
            return Ok(Self::empty());
        };

        let value =
            serde_json::to_value(overwrites).map_err(|e| CredentialsError::OverwriteConfig {
                reason: format!("cannot convert [overwrites] table: {e}"),
            })?;

        let set = Self::from_value(value)?;
        tracing::info!(
            path = %path.display(),
            type_count = set.inner.len(),
            "loaded credential overwrites"
        );
        Ok(set)
    }

    /// The overwrite entry for a type, if any.
    pub fn get(&self, type_name: &str) -> Option<&DecryptedData> {
        self.inner.get(type_name)
    }

    /// True when no type has any overwrite configured.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Apply the overwrites for `type_name` to `data`.
    ///
    /// Every configured key unconditionally replaces the corresponding
    /// field, regardless of what upstream stages produced. A type with no
    /// entry is a no-op, not an error.
    pub fn apply(&self, type_name: &str, mut data: DecryptedData) -> DecryptedData {
        let Some(fields) = self.inner.get(type_name) else {
            return data;
        };

        for (key, value) in fields {
            data.insert(key.clone(), value.clone());
        }

        tracing::debug!(
            type_name = %type_name,
            overwritten = fields.len(),
            "applied credential overwrites"
        );
        data
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(pairs: &[(&str, Value)]) -> DecryptedData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn overwrite_replaces_existing_and_adds_missing() {
        let set = CredentialOverwrites::from_value(json!({
            "service_api": { "host": "internal.local", "injected": "yes" }
        }))
        .unwrap();

        let out = set.apply("service_api", data(&[("host", json!("api.example.com"))]));
        assert_eq!(out["host"], "internal.local");
        assert_eq!(out["injected"], "yes");
    }

    #[test]
    fn unconfigured_type_is_a_no_op() {
        let set = CredentialOverwrites::from_value(json!({
            "service_api": { "host": "internal.local" }
        }))
        .unwrap();

        let input = data(&[("host", json!("api.example.com"))]);
        let out = set.apply("other_api", input.clone());
        assert_eq!(out, input);
    }

    #[test]
    fn empty_set_is_a_no_op() {
        let set = CredentialOverwrites::empty();
        assert!(set.is_empty());

        let input = data(&[("host", json!("api.example.com"))]);
        assert_eq!(set.apply("service_api", input.clone()), input);
    }

    #[test]
    fn non_object_entries_rejected() {
        assert!(CredentialOverwrites::from_value(json!("nope")).is_err());
        assert!(CredentialOverwrites::from_value(json!({ "t": "nope" })).is_err());
    }

    #[test]
    fn loads_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overwrites.toml");
        std::fs::write(
            &path,
            r#"
[store]
path = "unrelated"

[overwrites.service_api]
host = "internal.local"
port = 8443

[overwrites.github_api]
server = "https://github.internal"
"#,
        )
        .unwrap();

        let set = CredentialOverwrites::from_toml_file(&path).unwrap();
        assert_eq!(set.get("service_api").unwrap()["host"], "internal.local");
        assert_eq!(set.get("service_api").unwrap()["port"], 8443);
        assert_eq!(
            set.get("github_api").unwrap()["server"],
            "https://github.internal"
        );
    }

    #[test]
    fn toml_without_overwrites_table_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[store]\npath = \"x\"\n").unwrap();

        let set = CredentialOverwrites::from_toml_file(&path).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn missing_file_errors() {
        let result = CredentialOverwrites::from_toml_file("/nonexistent/overwrites.toml");
        assert!(matches!(
            result,
            Err(CredentialsError::OverwriteConfig { .. })
        ));
    }
}
