//! Credential type schema data model.
//!
//! A [`CredentialTypeSchema`] declares the fields an authentication method
//! requires: an ordered list of [`FieldSpec`]s plus an optional list of
//! parent type names (`extends`) whose fields are inherited. Inheritance is
//! resolved by the registry (see [`crate::registry`]), which folds parent
//! schemas into a single merged field list.

use serde::{Deserialize, Serialize};

/// The kind of value a credential field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free-form text (API keys, hostnames, usernames, ...).
    String,
    /// Numeric value (ports, timeouts).
    Number,
    /// True/false toggle.
    Boolean,
    /// One value out of a fixed set.
    Options,
    /// Nested group of sub-fields stored as a JSON object.
    Collection,
    /// Present in the data model but never rendered to the user.
    Hidden,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Options => write!(f, "options"),
            Self::Collection => write!(f, "collection"),
            Self::Hidden => write!(f, "hidden"),
        }
    }
}

/// A single field declared by a credential type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Machine-readable field key (e.g. `host`, `api_key`). Unique within
    /// a merged schema.
    pub key: String,
    /// Human-readable label.
    pub display_name: String,
    /// The kind of value this field holds.
    pub kind: FieldKind,
    /// Value filled in when the stored credential carries no entry for
    /// this key.
    #[serde(default)]
    pub default_value: serde_json::Value,
}

impl FieldSpec {
    /// Create a field spec with a `Null` default.
    pub fn new(key: impl Into<String>, display_name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            kind,
            default_value: serde_json::Value::Null,
        }
    }

    /// Set the default value for this field.
    pub fn with_default(mut self, default_value: impl Into<serde_json::Value>) -> Self {
        self.default_value = default_value.into();
        self
    }
}

/// A named credential type schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialTypeSchema {
    /// Unique type name (e.g. `http_basic_auth`, `github_api`).
    pub name: String,
    /// Human-readable label.
    pub display_name: String,
    /// Parent type names whose fields are inherited, in declared order.
    /// Empty means no inheritance.
    #[serde(default)]
    pub extends: Vec<String>,
    /// Fields declared directly on this type, in declared order. On merge,
    /// these overwrite inherited fields with the same key.
    pub properties: Vec<FieldSpec>,
}

impl CredentialTypeSchema {
    /// Create a schema with no parents and no fields.
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            extends: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Append a parent type to inherit from.
    pub fn with_extends(mut self, parent: impl Into<String>) -> Self {
        self.extends.push(parent.into());
        self
    }

    /// Append a directly-declared field.
    pub fn with_property(mut self, field: FieldSpec) -> Self {
        self.properties.push(field);
        self
    }
}
