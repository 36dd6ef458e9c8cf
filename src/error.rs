//! The compiler's error taxonomy.
//!
//! `spec.md` §7 names five kinds of failure rather than concrete types;
//! this is the `thiserror` enum that realizes them. Every fallible
//! operation in this crate returns `Result<T>` (this module's alias),
//! and compilation is fail-fast: the first `CompileError` aborts the
//! whole compile, so no partial statement map is ever observed by a
//! caller (`spec.md` §7).

use thiserror::Error;

/// One entry per taxonomy kind in `spec.md` §7. Each variant carries a
/// human-readable message and, where relevant, the offending
/// identifier(s) — never silently swallowed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Nulls/blanks where a value is required, zero primary-key columns,
    /// `_primaryKey` length mismatch, duplicate aliases, invalid GraphQL
    /// identifiers.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A filter map that is neither a column-with-operator shape, nor
    /// `and`/`or`, nor a known relation; unknown column; multiple
    /// operators in one leaf.
    #[error("invalid filter: {message}")]
    InvalidFilter { message: String },

    /// Table or column missing from schema; unknown link referenced by
    /// `connect_links`; unknown aggregate target.
    #[error("schema lookup failed: {message}")]
    SchemaLookup { message: String },

    /// Sort suffix other than `_asc`/`_desc`; aggregate function outside
    /// `{Count, Sum, Avg, Min, Max}`.
    #[error("not supported: {message}")]
    NotSupported { message: String },

    /// Recoverable errors meant to be surfaced to the GraphQL layer:
    /// primary-key mismatches, unknown joins.
    #[error("{message}")]
    ExecutionError { message: String },
}

impl CompileError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
        }
    }

    pub fn schema_lookup(message: impl Into<String>) -> Self {
        Self::SchemaLookup {
            message: message.into(),
        }
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::ExecutionError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
