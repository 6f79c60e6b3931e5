//! Credential type registry.
//!
//! The registry holds every credential type schema known to the process and
//! resolves a type name to its full, merged field list. Schemas are loaded
//! once at startup and read by any number of concurrent resolution
//! operations, so the registry is backed by [`DashMap`]: lock-free reads,
//! fine-grained write locking, no global `RwLock`.
//!
//! # Merging
//!
//! Merging is recursive and depth-first over `extends`. For each parent
//! listed (in order) the parent's own merged schema is computed first, then
//! folded into an accumulator: fields with new keys are appended, fields
//! with known keys overwrite in place (keeping their original position).
//! The type's directly-declared properties are folded last, so a direct
//! declaration always wins over anything inherited, no matter how deep.
//!
//! # Example
//!
//! ```rust
//! # use flowkit_schema::{CredentialTypeRegistry, CredentialTypeSchema, FieldSpec, FieldKind};
//! let registry = CredentialTypeRegistry::new();
//! registry.register(
//!     CredentialTypeSchema::new("base_api", "Base API")
//!         .with_property(FieldSpec::new("host", "Host", FieldKind::String).with_default("api.example.com")),
//! );
//! registry.register(CredentialTypeSchema::new("service_a", "Service A").with_extends("base_api"));
//!
//! let merged = registry.get_merged("service_a").unwrap();
//! assert_eq!(merged.properties[0].key, "host");
//! ```

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{Result, SchemaError};
use crate::types::{CredentialTypeSchema, FieldSpec};

/// Concurrent credential type registry backed by [`DashMap`].
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone)]
pub struct CredentialTypeRegistry {
    inner: Arc<DashMap<String, CredentialTypeSchema>>,
}

impl CredentialTypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Register a credential type schema.
    ///
    /// If a schema with the same name already exists, it is overwritten.
    pub fn register(&self, schema: CredentialTypeSchema) {
        tracing::info!(type_name = %schema.name, "credential type registered");
        self.inner.insert(schema.name.clone(), schema);
    }

    /// Retrieve a snapshot of a type's schema as declared, without merging
    /// inherited fields.
    pub fn get_raw(&self, type_name: &str) -> Result<CredentialTypeSchema> {
        self.inner
            .get(type_name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SchemaError::UnknownType {
                type_name: type_name.to_string(),
            })
    }

    /// Resolve a type name to its full merged schema, folding in every
    /// inherited field.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownType`] if `type_name` or any `extends`
    /// target is not registered, and [`SchemaError::CyclicInheritance`] if
    /// the `extends` graph loops back on itself.
    pub fn get_merged(&self, type_name: &str) -> Result<CredentialTypeSchema> {
        let mut in_progress = Vec::new();
        let properties = self.merged_properties(type_name, &mut in_progress)?;

        let raw = self.get_raw(type_name)?;
        tracing::debug!(
            type_name = %type_name,
            field_count = properties.len(),
            "merged credential type schema"
        );

        Ok(CredentialTypeSchema {
            name: raw.name,
            display_name: raw.display_name,
            extends: raw.extends,
            properties,
        })
    }

    /// Return a list of all registered type names.
    pub fn list_names(&self) -> Vec<String> {
        self.inner.iter().map(|e| e.key().clone()).collect()
    }

    /// Return the total number of registered types.
    pub fn count(&self) -> usize {
        self.inner.len()
    }

    /// Recursively compute the merged property list for `type_name`.
    ///
    /// `in_progress` holds the chain of types currently being merged; a
    /// repeat means the `extends` graph is cyclic.
    fn merged_properties(
        &self,
        type_name: &str,
        in_progress: &mut Vec<String>,
    ) -> Result<Vec<FieldSpec>> {
        if in_progress.iter().any(|seen| seen == type_name) {
            return Err(SchemaError::CyclicInheritance {
                type_name: type_name.to_string(),
            });
        }

        let schema = self.get_raw(type_name)?;
        if schema.extends.is_empty() {
            return Ok(schema.properties);
        }

        in_progress.push(type_name.to_string());

        let mut combined: Vec<FieldSpec> = Vec::new();
        for parent in &schema.extends {
            let parent_properties = self.merged_properties(parent, in_progress)?;
            fold_properties(&mut combined, parent_properties);
        }

        in_progress.pop();

        // Directly-declared fields fold last and win over inherited ones.
        fold_properties(&mut combined, schema.properties);

        Ok(combined)
    }
}

impl Default for CredentialTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold `incoming` fields into `accumulator`: new keys append in order,
/// existing keys are overwritten in place.
fn fold_properties(accumulator: &mut Vec<FieldSpec>, incoming: Vec<FieldSpec>) {
    for field in incoming {
        match accumulator.iter_mut().find(|f| f.key == field.key) {
            Some(existing) => *existing = field,
            None => accumulator.push(field),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldKind;

    fn base_schema() -> CredentialTypeSchema {
        CredentialTypeSchema::new("base_api", "Base API")
            .with_property(
                FieldSpec::new("host", "Host", FieldKind::String).with_default("api.example.com"),
            )
            .with_property(FieldSpec::new("port", "Port", FieldKind::Number).with_default(443))
    }

    #[test]
    fn register_and_get_raw() {
        let registry = CredentialTypeRegistry::new();
        registry.register(base_schema());

        let schema = registry.get_raw("base_api").expect("type should exist");
        assert_eq!(schema.name, "base_api");
        assert_eq!(schema.properties.len(), 2);
    }

    #[test]
    fn unknown_type_errors() {
        let registry = CredentialTypeRegistry::new();
        let result = registry.get_raw("nonexistent");
        assert!(matches!(result, Err(SchemaError::UnknownType { .. })));
    }

    #[test]
    fn merge_without_extends_returns_own_properties() {
        let registry = CredentialTypeRegistry::new();
        registry.register(base_schema());

        let merged = registry.get_merged("base_api").unwrap();
        assert_eq!(merged.properties.len(), 2);
        assert_eq!(merged.properties[0].key, "host");
        assert_eq!(merged.properties[1].key, "port");
    }

    #[test]
    fn child_inherits_parent_fields() {
        let registry = CredentialTypeRegistry::new();
        registry.register(base_schema());
        registry.register(
            CredentialTypeSchema::new("service_a", "Service A")
                .with_extends("base_api")
                .with_property(FieldSpec::new("api_key", "API Key", FieldKind::String)),
        );

        let merged = registry.get_merged("service_a").unwrap();
        let keys: Vec<&str> = merged.properties.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["host", "port", "api_key"]);
    }

    #[test]
    fn child_declaration_overrides_inherited_in_place() {
        let registry = CredentialTypeRegistry::new();
        registry.register(base_schema());
        registry.register(
            CredentialTypeSchema::new("service_a", "Service A")
                .with_extends("base_api")
                .with_property(
                    FieldSpec::new("host", "Host", FieldKind::String)
                        .with_default("service-a.example.com"),
                ),
        );

        let merged = registry.get_merged("service_a").unwrap();
        // Overridden field keeps its inherited position.
        assert_eq!(merged.properties[0].key, "host");
        assert_eq!(merged.properties[0].default_value, "service-a.example.com");
        assert_eq!(merged.properties.len(), 2);
    }

    #[test]
    fn grandparent_fields_merge_transitively() {
        let registry = CredentialTypeRegistry::new();
        registry.register(base_schema());
        registry.register(
            CredentialTypeSchema::new("oauth_api", "OAuth API")
                .with_extends("base_api")
                .with_property(FieldSpec::new("client_id", "Client ID", FieldKind::String)),
        );
        registry.register(
            CredentialTypeSchema::new("service_b", "Service B")
                .with_extends("oauth_api")
                .with_property(FieldSpec::new("region", "Region", FieldKind::String)),
        );

        let merged = registry.get_merged("service_b").unwrap();
        let keys: Vec<&str> = merged.properties.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["host", "port", "client_id", "region"]);
    }

    #[test]
    fn multiple_parents_fold_in_declared_order() {
        let registry = CredentialTypeRegistry::new();
        registry.register(
            CredentialTypeSchema::new("left", "Left")
                .with_property(FieldSpec::new("a", "A", FieldKind::String).with_default("left-a"))
                .with_property(FieldSpec::new("b", "B", FieldKind::String).with_default("left-b")),
        );
        registry.register(
            CredentialTypeSchema::new("right", "Right")
                .with_property(FieldSpec::new("b", "B", FieldKind::String).with_default("right-b"))
                .with_property(FieldSpec::new("c", "C", FieldKind::String).with_default("right-c")),
        );
        registry.register(
            CredentialTypeSchema::new("child", "Child")
                .with_extends("left")
                .with_extends("right"),
        );

        let merged = registry.get_merged("child").unwrap();
        let keys: Vec<&str> = merged.properties.iter().map(|f| f.key.as_str()).collect();
        // "b" keeps the position it was first seen at, with the later
        // parent's value.
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(merged.properties[1].default_value, "right-b");
    }

    #[test]
    fn cyclic_extends_rejected() {
        let registry = CredentialTypeRegistry::new();
        registry.register(CredentialTypeSchema::new("a", "A").with_extends("b"));
        registry.register(CredentialTypeSchema::new("b", "B").with_extends("a"));

        let result = registry.get_merged("a");
        assert!(matches!(result, Err(SchemaError::CyclicInheritance { .. })));
    }

    #[test]
    fn self_extends_rejected() {
        let registry = CredentialTypeRegistry::new();
        registry.register(CredentialTypeSchema::new("selfish", "Selfish").with_extends("selfish"));

        let result = registry.get_merged("selfish");
        assert!(matches!(result, Err(SchemaError::CyclicInheritance { .. })));
    }

    #[test]
    fn unknown_extends_target_errors() {
        let registry = CredentialTypeRegistry::new();
        registry.register(CredentialTypeSchema::new("orphan", "Orphan").with_extends("missing"));

        let result = registry.get_merged("orphan");
        assert!(matches!(
            result,
            Err(SchemaError::UnknownType { type_name }) if type_name == "missing"
        ));
    }

    #[test]
    fn diamond_inheritance_is_not_a_cycle() {
        // base is reachable through two paths; that is a diamond, not a
        // cycle, and must merge cleanly.
        let registry = CredentialTypeRegistry::new();
        registry.register(base_schema());
        registry.register(CredentialTypeSchema::new("mid_1", "Mid 1").with_extends("base_api"));
        registry.register(CredentialTypeSchema::new("mid_2", "Mid 2").with_extends("base_api"));
        registry.register(
            CredentialTypeSchema::new("bottom", "Bottom")
                .with_extends("mid_1")
                .with_extends("mid_2"),
        );

        let merged = registry.get_merged("bottom").unwrap();
        let keys: Vec<&str> = merged.properties.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["host", "port"]);
    }

    #[test]
    fn reregistration_overwrites() {
        let registry = CredentialTypeRegistry::new();
        registry.register(base_schema());
        registry.register(CredentialTypeSchema::new("base_api", "Base API v2"));

        let schema = registry.get_raw("base_api").unwrap();
        assert_eq!(schema.display_name, "Base API v2");
        assert!(schema.properties.is_empty());
        assert_eq!(registry.count(), 1);
    }
}
