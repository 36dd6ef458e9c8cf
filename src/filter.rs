//! The filter algebra (C5): boolean combinators over column predicates
//! and relation traversal, `spec.md` §4.4.
//!
//! A `Filter` is parsed once per request from a GraphQL argument blob
//! and compiled many times (main statement, count sibling) against the
//! same `ParameterCollection`, so compilation never mutates the tree —
//! `to_sql` only borrows.

use indexmap::IndexMap;

use crate::dialect::{Dialect, LikePattern};
use crate::error::{CompileError, Result};
use crate::params::{Parameter, ParameterCollection, ParameterizedSql};
use crate::schema::{SchemaModel, Table};
use crate::value::Value;

/// One comparison operator, keyed off the single `_op` entry inside a
/// column filter object (`{ Name: { _eq: "ada" } }`). Parsed
/// case-insensitively with the leading underscore stripped
/// (`spec.md` §9): the dialect-emitted SQL token's casing is a
/// separate, fixed concern handled by `Dialect::operator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FilterOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    #[strum(serialize = "ncontains")]
    NContains,
    StartsWith,
    EndsWith,
    Like,
    Nlike,
    In,
    Nin,
    Between,
    Nbetween,
    IsNull,
    IsNotNull,
}

impl FilterOp {
    fn like_kind(self) -> Option<LikePattern> {
        match self {
            FilterOp::Like | FilterOp::Nlike => Some(LikePattern::Exact),
            FilterOp::Contains | FilterOp::NContains => Some(LikePattern::Contains),
            FilterOp::StartsWith => Some(LikePattern::StartsWith),
            FilterOp::EndsWith => Some(LikePattern::EndsWith),
            _ => None,
        }
    }

    fn is_nullary(self) -> bool {
        matches!(self, FilterOp::IsNull | FilterOp::IsNotNull)
    }

    fn is_list(self) -> bool {
        matches!(self, FilterOp::In | FilterOp::Nin)
    }

    fn is_range(self) -> bool {
        matches!(self, FilterOp::Between | FilterOp::Nbetween)
    }
}

/// A node in the filter tree.
#[derive(Debug, Clone)]
pub enum Filter {
    Column {
        column: String,
        op: FilterOp,
        value: Value,
    },
    Relation {
        relation: String,
        filter: Box<Filter>,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

/// Parses an operator key such as `_eq`/`_starts_with`/`_is_not_null`,
/// stripping the leading underscore before matching `FilterOp`'s
/// `snake_case` names.
fn parse_op_key(key: &str) -> Option<FilterOp> {
    key.strip_prefix('_').unwrap_or(key).parse::<FilterOp>().ok()
}

/// The two fragments a compiled filter tree produces (`spec.md` §4.5):
/// zero or more `INNER JOIN` clauses contributed by `Relation` nodes,
/// plus the boolean predicate text that goes after `WHERE`. Kept apart
/// during recursion so `And`/`Or` can merge sibling joins without
/// entangling them in the parenthesized predicate text, then flattened
/// into one `ParameterizedSql` by `get_filter_sql_parameterized`.
struct Compiled {
    joins: Vec<ParameterizedSql>,
    predicate: ParameterizedSql,
}

impl Filter {
    /// Parses a GraphQL `where`-style argument object into a filter
    /// tree (`spec.md` §4.5):
    /// - `and`/`or` (case-insensitive) with a list value combine each
    ///   element's parsed sub-filter.
    /// - A known column name with a map value of exactly one
    ///   `{ _op: value }` pair produces a `Column` leaf.
    /// - A known relation name with a map value produces a `Relation`
    ///   leaf, parsed recursively against the related table.
    /// - Any other shape fails as `"Invalid filter object"`.
    pub fn from_object(table: &Table, schema: &SchemaModel, obj: &IndexMap<String, Value>) -> Result<Filter> {
        let mut clauses = Vec::new();

        for (key, value) in obj {
            let lower = key.to_lowercase();
            if lower == "and" || lower == "or" {
                let items = value.as_list().ok_or_else(|| {
                    CompileError::invalid_filter(format!("'{key}' must be a list of filter objects"))
                })?;
                let mut parsed = Vec::with_capacity(items.len());
                for item in items {
                    let item_obj = item.as_map().ok_or_else(|| {
                        CompileError::invalid_filter(format!("'{key}' entries must be objects"))
                    })?;
                    parsed.push(Filter::from_object(table, schema, item_obj)?);
                }
                clauses.push(if lower == "and" {
                    Filter::And(parsed)
                } else {
                    Filter::Or(parsed)
                });
                continue;
            }

            if table.column_by_graphql_name(key).is_some() {
                let op_map = value.as_map().ok_or_else(|| {
                    CompileError::invalid_filter(format!(
                        "column filter '{key}' must be an object of the form {{ _op: value }}"
                    ))
                })?;
                if op_map.len() != 1 {
                    return Err(CompileError::invalid_filter(format!(
                        "column filter '{key}' must have exactly one operator, got {}",
                        op_map.len()
                    )));
                }
                let (op_key, op_value) = op_map.iter().next().expect("checked len == 1");
                let op = parse_op_key(op_key).ok_or_else(|| {
                    CompileError::invalid_filter(format!("unknown operator '{op_key}' on '{key}'"))
                })?;
                clauses.push(Filter::Column {
                    column: key.clone(),
                    op,
                    value: op_value.clone(),
                });
                continue;
            }

            if table.single_link(key).is_some()
                || table.multi_link(key).is_some()
                || table.many_to_many_link(key).is_some()
            {
                let nested_obj = value.as_map().ok_or_else(|| {
                    CompileError::invalid_filter(format!("relation filter '{key}' must be an object"))
                })?;
                let nested_table = relation_target_table(table, schema, key)?;
                let nested = Filter::from_object(nested_table, schema, nested_obj)?;
                clauses.push(Filter::Relation {
                    relation: key.clone(),
                    filter: Box::new(nested),
                });
                continue;
            }

            return Err(CompileError::invalid_filter(format!(
                "Invalid filter object: '{key}' is neither a known column nor a relation on '{}'",
                table.graphql_name
            )));
        }

        // A single top-level key parses to a bare clause, not an `And`
        // of one — `to_sql` never adds parentheses around a lone
        // predicate (`spec.md` §8, scenario 1). Multiple keys combine
        // with an implicit `And`.
        if clauses.len() == 1 {
            Ok(clauses.into_iter().next().expect("checked len == 1"))
        } else {
            Ok(Filter::And(clauses))
        }
    }

    /// Builds an `And` of equality predicates over the table's primary
    /// key columns, in declaration order, from a `_primaryKey`
    /// argument. Errors when the argument's arity doesn't match the
    /// table's primary-key arity (`spec.md` §7).
    pub fn from_primary_key(table: &Table, values: &[Value]) -> Result<Filter> {
        let pk_columns = table.primary_key_columns();
        if pk_columns.is_empty() {
            return Err(CompileError::invalid_argument(format!(
                "table '{}' has no primary key columns",
                table.graphql_name
            )));
        }
        if pk_columns.len() != values.len() {
            return Err(CompileError::invalid_argument(format!(
                "expected {} primary key value(s) for '{}', got {}",
                pk_columns.len(),
                table.graphql_name,
                values.len()
            )));
        }

        let mut clauses: Vec<Filter> = pk_columns
            .into_iter()
            .zip(values.iter().cloned())
            .map(|(col, value)| {
                let op = if value.is_null() { FilterOp::IsNull } else { FilterOp::Eq };
                Filter::Column {
                    column: col.graphql_name.clone(),
                    op,
                    value,
                }
            })
            .collect();

        // A single-column primary key yields a bare leaf, not an `And`
        // of one (`spec.md` §4.5).
        if clauses.len() == 1 {
            Ok(clauses.remove(0))
        } else {
            Ok(Filter::And(clauses))
        }
    }

    /// Pre-pass validating every column reference against `table`
    /// before any SQL is emitted, so a typo surfaces as `InvalidFilter`
    /// rather than a `SchemaLookup` failure deep in emission.
    pub fn validate(&self, table: &Table, schema: &SchemaModel) -> Result<()> {
        match self {
            Filter::Column { column, op, value } => {
                let col = table.column_by_graphql_name(column).ok_or_else(|| {
                    CompileError::invalid_filter(format!(
                        "unknown column '{column}' on '{}'",
                        table.graphql_name
                    ))
                })?;
                if op.is_list() && value.as_list().is_none() {
                    return Err(CompileError::invalid_filter(format!(
                        "operator '{op}' on '{}' requires a list value",
                        col.graphql_name
                    )));
                }
                if op.is_range() {
                    let items = value.as_list().ok_or_else(|| {
                        CompileError::invalid_filter(format!(
                            "operator '{op}' on '{}' requires a two-element list",
                            col.graphql_name
                        ))
                    })?;
                    if items.len() != 2 {
                        return Err(CompileError::invalid_filter(format!(
                            "operator '{op}' on '{}' requires exactly two values",
                            col.graphql_name
                        )));
                    }
                }
                Ok(())
            }
            Filter::Relation { relation, filter } => {
                let nested_table = relation_target_table(table, schema, relation)?;
                filter.validate(nested_table, schema)
            }
            Filter::And(items) | Filter::Or(items) => {
                for item in items {
                    item.validate(table, schema)?;
                }
                Ok(())
            }
        }
    }

    /// Compiles this filter into a single `ParameterizedSql`: any
    /// `INNER JOIN` fragments contributed by `Relation` nodes, followed
    /// by the parenthesized boolean predicate — the flattened form of
    /// the `(join_fragment, where_fragment)` pair `spec.md` §4.5
    /// describes for relation traversal. Callers building a full
    /// statement should use `get_filter_sql_parameterized` instead,
    /// which places the two parts correctly around `WHERE`.
    pub fn to_sql(
        &self,
        table: &Table,
        schema: &SchemaModel,
        dialect: &dyn Dialect,
        params: &ParameterCollection,
    ) -> Result<ParameterizedSql> {
        let compiled = self.compile(table, schema, dialect, params, &table.db_name)?;
        let mut sql = String::new();
        let mut parameters = Vec::new();
        for join in &compiled.joins {
            if !sql.is_empty() {
                sql.push(' ');
            }
            sql.push_str(&join.sql);
            parameters.extend(join.parameters.iter().cloned());
        }
        if !compiled.predicate.sql.is_empty() {
            if !sql.is_empty() {
                sql.push(' ');
            }
            sql.push_str(&compiled.predicate.sql);
            parameters.extend(compiled.predicate.parameters.iter().cloned());
        }
        Ok(ParameterizedSql::with_parameters(sql, parameters))
    }

    fn compile(
        &self,
        table: &Table,
        schema: &SchemaModel,
        dialect: &dyn Dialect,
        params: &ParameterCollection,
        alias: &str,
    ) -> Result<Compiled> {
        match self {
            Filter::Column { column, op, value } => {
                let col = table.column_by_graphql_name(column).ok_or_else(|| {
                    CompileError::invalid_filter(format!(
                        "unknown column '{column}' on '{}'",
                        table.graphql_name
                    ))
                })?;
                let column_ref = format!(
                    "{}.{}",
                    dialect.escape_identifier(alias),
                    dialect.escape_identifier(&col.db_name)
                );
                Ok(Compiled {
                    joins: Vec::new(),
                    predicate: column_predicate_sql(&column_ref, *op, value, dialect, params)?,
                })
            }
            Filter::Relation { relation, filter } => {
                relation_join_sql(table, schema, dialect, params, alias, relation, filter)
            }
            Filter::And(items) => combine(items, table, schema, dialect, params, alias, "AND"),
            Filter::Or(items) => combine(items, table, schema, dialect, params, alias, "OR"),
        }
    }

    /// The real `WHERE`-clause entry point: prepends any relation-
    /// induced `INNER JOIN` fragments ahead of `WHERE`, then the
    /// predicate body; an empty filter compiles to an empty fragment
    /// (no `WHERE`, no joins) so the caller can append it directly
    /// after `FROM <table>` (`spec.md` §4.5/§4.6).
    pub fn get_filter_sql_parameterized(
        &self,
        table: &Table,
        schema: &SchemaModel,
        dialect: &dyn Dialect,
        params: &ParameterCollection,
    ) -> Result<ParameterizedSql> {
        let compiled = self.compile(table, schema, dialect, params, &table.db_name)?;
        let mut sql = String::new();
        let mut parameters = Vec::new();
        for join in &compiled.joins {
            sql.push(' ');
            sql.push_str(&join.sql);
            parameters.extend(join.parameters.iter().cloned());
        }
        if !compiled.predicate.sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&compiled.predicate.sql);
            parameters.extend(compiled.predicate.parameters.iter().cloned());
        }
        Ok(ParameterizedSql::with_parameters(sql, parameters))
    }
}

fn relation_target_table<'a>(
    table: &Table,
    schema: &'a SchemaModel,
    relation: &str,
) -> Result<&'a Table> {
    if let Some(r) = table.single_link(relation) {
        return schema.table_by_db_name(&r.parent_table).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", r.parent_table))
        });
    }
    if let Some(r) = table.multi_link(relation) {
        return schema.table_by_db_name(&r.child_table).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", r.child_table))
        });
    }
    if let Some(r) = table.many_to_many_link(relation) {
        return schema.table_by_db_name(&r.target_table).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", r.target_table))
        });
    }
    Err(CompileError::schema_lookup(format!(
        "unknown relation '{relation}' on '{}'",
        table.graphql_name
    )))
}

/// Compiles a `Relation` node to an `INNER JOIN` against a `DISTINCT
/// … AS joinid` pin-set subquery over the related table, with the
/// nested filter applied inside that subquery (`spec.md` §4.5). The
/// relation contributes no predicate text of its own — satisfying the
/// join condition *is* the predicate — so the returned `Compiled` has
/// an empty `predicate` and exactly one `joins` entry.
fn relation_join_sql(
    table: &Table,
    schema: &SchemaModel,
    dialect: &dyn Dialect,
    params: &ParameterCollection,
    alias: &str,
    relation: &str,
    nested_filter: &Filter,
) -> Result<Compiled> {
    let (related_table_name, inner_id, owner_column) = if let Some(r) = table.single_link(relation) {
        (r.parent_table.clone(), r.parent_column.clone(), r.child_column.clone())
    } else if let Some(r) = table.multi_link(relation) {
        (r.child_table.clone(), r.child_column.clone(), r.parent_column.clone())
    } else if let Some(r) = table.many_to_many_link(relation) {
        (r.target_table.clone(), r.target_column.clone(), r.source_column.clone())
    } else {
        return Err(CompileError::schema_lookup(format!(
            "unknown relation '{relation}' on '{}'",
            table.graphql_name
        )));
    };

    let related_table = schema.table_by_db_name(&related_table_name).ok_or_else(|| {
        CompileError::schema_lookup(format!("unknown table '{related_table_name}'"))
    })?;

    let nested = nested_filter.compile(related_table, schema, dialect, params, &related_table_name)?;

    let mut pin_set_parameters = Vec::new();
    let mut pin_set = format!(
        "SELECT DISTINCT {} AS joinid FROM {}",
        dialect.escape_identifier(&inner_id),
        dialect.table_reference(related_table.schema.as_deref(), &related_table_name)
    );
    for join in &nested.joins {
        pin_set.push(' ');
        pin_set.push_str(&join.sql);
        pin_set_parameters.extend(join.parameters.iter().cloned());
    }
    if !nested.predicate.sql.is_empty() {
        pin_set.push_str(" WHERE ");
        pin_set.push_str(&nested.predicate.sql);
        pin_set_parameters.extend(nested.predicate.parameters.iter().cloned());
    }

    let join_alias = format!("{relation}_pin");
    let join_fragment = format!(
        "INNER JOIN ({pin_set}) AS {} ON {}.{} = {}.{}",
        dialect.escape_identifier(&join_alias),
        dialect.escape_identifier(alias),
        dialect.escape_identifier(&owner_column),
        dialect.escape_identifier(&join_alias),
        dialect.escape_identifier("joinid"),
    );

    Ok(Compiled {
        joins: vec![ParameterizedSql::with_parameters(join_fragment, pin_set_parameters)],
        predicate: ParameterizedSql::empty(),
    })
}

/// `And`/`Or` render as `((l) OP (r) … )` — every child's predicate
/// parenthesized, the whole join parenthesized once more (`spec.md`
/// §4.5). Join fragments contributed by any child (directly or via a
/// nested `Relation`) are hoisted out and concatenated, since a `JOIN`
/// can't itself live inside a parenthesized boolean expression.
fn combine(
    items: &[Filter],
    table: &Table,
    schema: &SchemaModel,
    dialect: &dyn Dialect,
    params: &ParameterCollection,
    alias: &str,
    joiner: &str,
) -> Result<Compiled> {
    if items.is_empty() {
        return Ok(Compiled {
            joins: Vec::new(),
            predicate: ParameterizedSql::empty(),
        });
    }

    let mut joins = Vec::new();
    let mut sql_parts = Vec::with_capacity(items.len());
    let mut parameters = Vec::new();
    for item in items {
        let compiled = item.compile(table, schema, dialect, params, alias)?;
        joins.extend(compiled.joins);
        if compiled.predicate.sql.is_empty() {
            continue;
        }
        sql_parts.push(format!("({})", compiled.predicate.sql));
        parameters.extend(compiled.predicate.parameters);
    }

    if sql_parts.is_empty() {
        return Ok(Compiled {
            joins,
            predicate: ParameterizedSql::empty(),
        });
    }

    let joined = sql_parts.join(&format!(" {joiner} "));
    Ok(Compiled {
        joins,
        predicate: ParameterizedSql::with_parameters(format!("({joined})"), parameters),
    })
}

fn column_predicate_sql(
    column_ref: &str,
    op: FilterOp,
    value: &Value,
    dialect: &dyn Dialect,
    params: &ParameterCollection,
) -> Result<ParameterizedSql> {
    if op.is_nullary() {
        let token = dialect.operator(op);
        return Ok(ParameterizedSql::new(format!("{column_ref} {token}")));
    }

    // `_eq`/`_neq` against a null value render as `IS NULL`/`IS NOT NULL`
    // with zero parameters rather than a bound comparison (`spec.md` §4.5).
    if value.is_null() {
        match op {
            FilterOp::Eq => return Ok(ParameterizedSql::new(format!("{column_ref} IS NULL"))),
            FilterOp::Neq => return Ok(ParameterizedSql::new(format!("{column_ref} IS NOT NULL"))),
            _ => {}
        }
    }

    if op.is_list() {
        let items = value.as_list().ok_or_else(|| {
            CompileError::invalid_filter(format!("operator '{op}' requires a list value"))
        })?;
        let token = dialect.operator(op);
        let (names, parameters) = params.add_many(items.to_vec(), None);
        return Ok(ParameterizedSql::with_parameters(
            format!("{column_ref} {token} ({names})"),
            parameters,
        ));
    }

    if op.is_range() {
        let items = value.as_list().ok_or_else(|| {
            CompileError::invalid_filter(format!("operator '{op}' requires a two-element list"))
        })?;
        if items.len() != 2 {
            return Err(CompileError::invalid_filter(format!(
                "operator '{op}' requires exactly two values"
            )));
        }
        let low = params.add_one(items[0].clone(), None);
        let high = params.add_one(items[1].clone(), None);
        let token = dialect.operator(op);
        return Ok(ParameterizedSql::with_parameters(
            format!("{column_ref} {token} {} AND {}", low.name, high.name),
            vec![low, high],
        ));
    }

    if let Some(kind) = op.like_kind() {
        let param = params.add_one(value.clone(), None);
        let token = dialect.operator(op);
        let rendered = dialect.like_pattern(&param.name, kind);
        return Ok(ParameterizedSql::with_parameters(
            format!("{column_ref} {token} {rendered}"),
            vec![param],
        ));
    }

    let param = params.add_one(value.clone(), None);
    let token = dialect.operator(op);
    Ok(ParameterizedSql::with_parameters(
        format!("{column_ref} {token} {}", param.name),
        vec![param],
    ))
}
