//! `ParameterPrimaryKey` (C9): merging a `_primaryKey` argument with an
//! existing filter for single-row mutations/lookups (`spec.md` §4.9).
//!
//! Built directly on `Filter::from_primary_key` — this module's only
//! job is the merge, not primary-key parsing itself.

use crate::error::Result;
use crate::filter::Filter;
use crate::schema::Table;
use crate::value::Value;

/// A primary-key-qualified filter: the equality predicates over a
/// table's key columns, optionally `AND`-combined with a caller-
/// supplied filter (e.g. a tenant scoping clause added by the caller
/// ahead of the user's own `_primaryKey` lookup).
#[derive(Debug, Clone)]
pub struct ParameterPrimaryKey {
    pub filter: Filter,
}

impl ParameterPrimaryKey {
    /// Builds the bare primary-key filter with no additional predicate.
    pub fn from_values(table: &Table, values: &[Value]) -> Result<Self> {
        Ok(Self {
            filter: Filter::from_primary_key(table, values)?,
        })
    }

    /// Builds the primary-key filter and combines it with `extra` via
    /// `AND` — both must hold for a row to match. `extra` (the original
    /// filter) is the first child, the primary-key filter the second
    /// (`spec.md` §8, "PrimaryKey merge").
    pub fn merge_with(table: &Table, values: &[Value], extra: Filter) -> Result<Self> {
        let pk_filter = Filter::from_primary_key(table, values)?;
        Ok(Self {
            filter: Filter::And(vec![extra, pk_filter]),
        })
    }

    pub fn into_filter(self) -> Filter {
        self.filter
    }
}
