//! Embedded expression resolution for flowkit credential fields.
//!
//! Stored credential values may contain small templated expressions
//! (`=https://{{ $parameter.host }}/api`) that must be evaluated to their
//! final value before a connector can use them. This crate evaluates those
//! templates against a synthetic single-node context — a placeholder node
//! carrying the field map as its parameters, with no real workflow graph
//! behind it.
//!
//! # Modules
//!
//! - [`context`] — the throwaway single-node evaluation scaffold.
//! - [`eval`] — template scanning and `$parameter` accessor evaluation.
//! - [`error`] — unified error types.

pub mod context;
pub mod error;
pub mod eval;

// Re-export the most commonly used items at the crate root for convenience.
pub use context::{SyntheticGraph, SyntheticNode};
pub use error::{ExpressionError, FieldError, Result};
pub use eval::{resolve_map, resolve_map_with_context};
