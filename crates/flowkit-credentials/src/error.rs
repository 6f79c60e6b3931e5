//! Credential pipeline error types.

use flowkit_expression::ExpressionError;
use flowkit_schema::SchemaError;
use flowkit_vault::VaultError;

/// Unified error type for the credential resolution pipeline.
///
/// Schema and store failures pass through unchanged so callers can match on
/// their structured variants (`UnknownType`, `CredentialNotFound`,
/// `DecryptionFailed`, ...). Expression failures are annotated with the
/// credential field that failed.
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    /// Type registry failure: unknown type or cyclic inheritance.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Store failure: missing record, decryption failure, persistence I/O.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// An embedded expression failed to evaluate. Aborts the whole
    /// resolution; no partial data is returned.
    #[error("expression resolution failed for field `{field}`: {source}")]
    Expression {
        field: String,
        #[source]
        source: ExpressionError,
    },

    /// The overwrite configuration could not be loaded or parsed.
    #[error("invalid overwrite configuration: {reason}")]
    OverwriteConfig { reason: String },
}

impl From<flowkit_expression::FieldError> for CredentialsError {
    fn from(err: flowkit_expression::FieldError) -> Self {
        Self::Expression {
            field: err.field,
            source: err.source,
        }
    }
}

/// Convenience alias used throughout the credentials crate.
pub type Result<T> = std::result::Result<T, CredentialsError>;
