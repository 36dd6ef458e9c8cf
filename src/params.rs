//! `ParameterCollection` (C2) and `ParameterizedSql` (C3) — `spec.md`
//! §4.2–4.3.
//!
//! A single `ParameterCollection` is shared by every emitter in one
//! compile (main statement, count sibling, each join, each aggregate),
//! because the compiler may run those emitters concurrently
//! (`spec.md` §5). Safety comes from an atomic counter for name
//! allocation plus a `parking_lot::Mutex` around the insertion-ordered
//! store — the same "small mutex around a plain collection" shape the
//! teacher reaches for with its `SqlitePool` handles, sized here for a
//! hot, short-lived per-request path instead of a long-lived connection
//! pool.

use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::error::{CompileError, Result};
use crate::value::Value;

/// One allocated parameter: its generated name, bound value, and an
/// optional backend-specific type hint.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
    pub db_type: Option<String>,
}

/// Append-only, thread-safe store of `(name, value, db_type)` tuples
/// with monotonically increasing names `{prefix}p0, {prefix}p1, …`.
/// Lives for one request; released after all statements are dispatched.
pub struct ParameterCollection {
    prefix: String,
    counter: AtomicUsize,
    store: Mutex<IndexMap<String, (Value, Option<String>)>>,
}

impl ParameterCollection {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicUsize::new(0),
            store: Mutex::new(IndexMap::new()),
        }
    }

    fn next_name(&self) -> String {
        let idx = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}p{}", self.prefix, idx)
    }

    /// Allocates one parameter and returns it directly — the caller
    /// never needs to re-derive which entry it just added from a
    /// shared snapshot, which would race against concurrent allocators
    /// (`spec.md` §5).
    pub fn add_one(&self, value: Value, db_type: Option<String>) -> Parameter {
        let name = self.next_name();
        self.store
            .lock()
            .insert(name.clone(), (value.clone(), db_type.clone()));
        tracing::debug!(parameter = %name, "allocated parameter");
        Parameter {
            name,
            value,
            db_type,
        }
    }

    /// Allocates one parameter per value and returns both the
    /// comma-joined, parenthesizable name list (e.g. `"p0, p1, p2"`)
    /// and the exact `Parameter`s just allocated, in order — never
    /// read back from the shared store, so a concurrent allocator
    /// racing this call can't smuggle its own entries into the result.
    pub fn add_many(&self, values: Vec<Value>, db_type: Option<String>) -> (String, Vec<Parameter>) {
        let parameters: Vec<Parameter> = values
            .into_iter()
            .map(|v| self.add_one(v, db_type.clone()))
            .collect();
        let names = parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        (names, parameters)
    }

    /// A point-in-time, insertion-ordered snapshot. Does not drain the
    /// collection — use while other emitters may still be allocating.
    pub fn snapshot_ordered(&self) -> Vec<Parameter> {
        self.store
            .lock()
            .iter()
            .map(|(name, (value, db_type))| Parameter {
                name: name.clone(),
                value: value.clone(),
                db_type: db_type.clone(),
            })
            .collect()
    }

    /// Consumes the collection, returning its parameters in insertion
    /// order — the shape the DTO boundary and test assertions want
    /// (`spec.md` §5: "iteration for the DTO result sorts by index to
    /// restore insertion order").
    pub fn into_ordered_vec(self) -> Vec<Parameter> {
        self.store
            .into_inner()
            .into_iter()
            .map(|(name, (value, db_type))| Parameter {
                name,
                value,
                db_type,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable `(sql_text, parameters)` value. Every composition operation
/// returns a new value so the same filter can be safely emitted into
/// multiple statements without risking shared-state mutation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterizedSql {
    pub sql: String,
    pub parameters: Vec<Parameter>,
}

impl ParameterizedSql {
    /// The empty sentinel: no text, no parameters.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameters(sql: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            sql: sql.into(),
            parameters,
        }
    }

    /// Constructs from an optional SQL string, failing with
    /// `InvalidArgument` when it is absent — the one boundary in a Rust
    /// port where the teacher's source language's "null string" can
    /// actually occur: a dynamic `Value` that resolved to `Value::Null`
    /// where SQL text was expected.
    pub fn try_from_optional(sql: Option<impl Into<String>>) -> Result<Self> {
        match sql {
            Some(s) => Ok(Self::new(s)),
            None => Err(CompileError::invalid_argument(
                "ParameterizedSql cannot be constructed from a null SQL string",
            )),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty() && self.parameters.is_empty()
    }

    /// Appends raw SQL text, returning a new value.
    pub fn append_str(&self, tail: &str) -> Self {
        Self {
            sql: format!("{}{}", self.sql, tail),
            parameters: self.parameters.clone(),
        }
    }

    /// Concatenates text and parameters from `other`, returning a new
    /// value.
    pub fn append(&self, other: &ParameterizedSql) -> Self {
        let mut parameters = self.parameters.clone();
        parameters.extend(other.parameters.iter().cloned());
        Self {
            sql: format!("{}{}", self.sql, other.sql),
            parameters,
        }
    }

    pub fn prepend_str(&self, head: &str) -> Self {
        Self {
            sql: format!("{}{}", head, self.sql),
            parameters: self.parameters.clone(),
        }
    }
}
