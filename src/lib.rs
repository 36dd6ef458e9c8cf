//! BifrostQL: compiles GraphQL selections against a relational schema
//! model into parameterized, dialect-aware SQL.
//!
//! The crate never executes anything against a database — it only
//! turns a schema model plus a lowered query into `ParameterizedSql`
//! text and bindings. Wiring a live connection, introspecting a real
//! database, and serving GraphQL over HTTP are the host application's
//! job; see [`adapter`] for the seam where a GraphQL implementation
//! plugs in.
//!
//! ```text
//! GraphQL selection ─▶ adapter::RequestAdapter ─▶ query::ObjectQuery ─▶ ParameterizedSql
//! ```

pub mod adapter;
pub mod config;
pub mod dialect;
pub mod error;
pub mod filter;
pub mod params;
pub mod pivot;
pub mod primary_key;
pub mod query;
pub mod schema;
pub mod value;

pub use adapter::{
    Fragments, FromQueryField, QueryField, QueryIntent, QueryIntentKind, RequestAdapter, RequestType,
    ToQueryField,
};
pub use config::CompilerConfig;
pub use dialect::{dialect_for, Dialect, DialectKind};
pub use error::{CompileError, Result};
pub use filter::{Filter, FilterOp};
pub use params::{Parameter, ParameterCollection, ParameterizedSql};
pub use pivot::PivotPlanner;
pub use primary_key::ParameterPrimaryKey;
pub use query::{AggregateColumn, AggregateFn, ObjectQuery, QueryType};
pub use schema::{Column, ForeignKeyCatalog, RawColumn, RawForeignKey, RawTable, SchemaModel, Table};
pub use value::Value;
