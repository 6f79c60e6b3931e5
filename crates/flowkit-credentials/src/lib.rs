//! Credential resolution pipeline for flowkit.
//!
//! Turns an encrypted, persisted credential record into the final plaintext
//! value set a connector uses to authenticate. Data flows one direction:
//!
//! ```text
//! store (decrypt) → defaults → expressions → overwrites → caller
//! ```
//!
//! The write path is the inverse: caller data → encrypt → store, with none
//! of the read-time transformations.
//!
//! # Modules
//!
//! - [`defaults`] — fill schema-declared default values.
//! - [`overwrites`] — administrator-forced field values, applied last.
//! - [`resolver`] — the [`CredentialResolver`] facade.
//! - [`error`] — unified error types.

pub mod defaults;
pub mod error;
pub mod overwrites;
pub mod resolver;

// Re-export the most commonly used types at the crate root for convenience.
pub use defaults::apply_defaults;
pub use error::{CredentialsError, Result};
pub use overwrites::CredentialOverwrites;
pub use resolver::{CredentialResolver, OAUTH_TOKEN_DATA_KEY};
