//! Expression error types.

/// Errors raised while resolving an embedded expression.
///
/// Each variant names the expression it came from, so the caller can report
/// which credential field failed without string-parsing.
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    /// The expression references a root or key that does not exist in the
    /// evaluation context.
    #[error("unknown reference `{path}` in expression `{expression}`")]
    UnknownReference { expression: String, path: String },

    /// A `{{ }}` segment contained nothing to evaluate.
    #[error("empty segment in expression `{expression}`")]
    EmptySegment { expression: String },

    /// The accessor syntax after `$parameter` could not be parsed.
    #[error("invalid accessor `{accessor}` in expression `{expression}`")]
    InvalidAccessor { expression: String, accessor: String },
}

/// An expression failure annotated with the credential field it occurred
/// in. Returned by [`crate::eval::resolve_map`] so callers can surface the
/// offending field without re-deriving it.
#[derive(Debug, thiserror::Error)]
#[error("field `{field}`: {source}")]
pub struct FieldError {
    /// Top-level field whose value (or nested value) failed to resolve.
    pub field: String,
    #[source]
    pub source: ExpressionError,
}

/// Convenience alias used throughout the expression crate.
pub type Result<T> = std::result::Result<T, ExpressionError>;
