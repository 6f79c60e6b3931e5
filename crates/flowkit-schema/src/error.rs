//! Schema error types.

/// Errors surfaced by the credential type registry.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The requested credential type is not registered. Also raised when a
    /// registered type `extends` a name the registry has never seen.
    #[error("unknown credential type: {type_name}")]
    UnknownType { type_name: String },

    /// The `extends` graph contains a cycle reachable from this type.
    #[error("cyclic inheritance detected at credential type: {type_name}")]
    CyclicInheritance { type_name: String },
}

/// Convenience alias used throughout the schema crate.
pub type Result<T> = std::result::Result<T, SchemaError>;
