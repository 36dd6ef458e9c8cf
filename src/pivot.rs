//! Pivot-table codegen (C8): turning distinct values of one column
//! into columns of their own, aggregated over another (`spec.md` §4.8).
//!
//! SQL Server gets the native `PIVOT` operator; every other backend
//! falls back to a `CASE WHEN ... END` aggregate per pivoted value —
//! the two code paths produce the same result set shape, just by
//! different means.

use crate::dialect::{Dialect, DialectKind};
use crate::error::{CompileError, Result};
use crate::filter::Filter;
use crate::params::{ParameterCollection, ParameterizedSql};
use crate::query::AggregateFn;
use crate::schema::SchemaModel;
use crate::value::Value;

/// Plans a single pivot query: rows grouped by every *other* selected
/// column, one output column per entry in `pivot_values`.
#[derive(Debug, Clone)]
pub struct PivotPlanner {
    pub table: String,
    pub group_by: Vec<String>,
    pub pivot_column: String,
    pub value_column: String,
    pub aggregate: AggregateFn,
    pub pivot_values: Vec<Value>,
    pub null_label: String,
    pub filter: Filter,
}

impl PivotPlanner {
    pub fn new(
        table: impl Into<String>,
        pivot_column: impl Into<String>,
        value_column: impl Into<String>,
        aggregate: AggregateFn,
    ) -> Self {
        Self {
            table: table.into(),
            group_by: Vec::new(),
            pivot_column: pivot_column.into(),
            value_column: value_column.into(),
            aggregate,
            pivot_values: Vec::new(),
            null_label: "_null_".to_string(),
            filter: Filter::And(vec![]),
        }
    }

    /// The query used to discover pivot column values ahead of time,
    /// when the caller hasn't supplied `pivot_values` explicitly.
    pub fn distinct_values_sql(
        &self,
        schema: &SchemaModel,
        dialect: &dyn Dialect,
        params: &ParameterCollection,
    ) -> Result<ParameterizedSql> {
        let table = schema.table_by_db_name(&self.table).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", self.table))
        })?;
        let column = table.column_by_graphql_name(&self.pivot_column).ok_or_else(|| {
            CompileError::schema_lookup(format!(
                "unknown pivot column '{}' on '{}'",
                self.pivot_column, table.graphql_name
            ))
        })?;
        let from = dialect.table_reference(table.schema.as_deref(), &table.db_name);
        let where_clause = self
            .filter
            .get_filter_sql_parameterized(table, schema, dialect, params)?;
        Ok(ParameterizedSql::with_parameters(
            format!(
                "SELECT DISTINCT {} FROM {from}{}",
                dialect.escape_identifier(&column.db_name),
                where_clause.sql
            ),
            where_clause.parameters,
        ))
    }

    fn validate(&self) -> Result<()> {
        if self.pivot_values.is_empty() {
            return Err(CompileError::invalid_argument(
                "pivot query requires at least one pivot value; run distinct_values_sql first",
            ));
        }
        if self.aggregate == AggregateFn::Count && self.value_column.is_empty() {
            return Err(CompileError::invalid_argument(
                "Count aggregate requires a value column",
            ));
        }
        Ok(())
    }

    /// Compiles the pivot query for `dialect` — native `PIVOT` on SQL
    /// Server, `CASE WHEN` elsewhere.
    pub fn to_sql_parameterized(
        &self,
        schema: &SchemaModel,
        dialect_kind: DialectKind,
        dialect: &dyn Dialect,
        params: &ParameterCollection,
    ) -> Result<ParameterizedSql> {
        self.validate()?;
        let table = schema.table_by_db_name(&self.table).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", self.table))
        })?;
        let pivot_col = table.column_by_graphql_name(&self.pivot_column).ok_or_else(|| {
            CompileError::schema_lookup(format!(
                "unknown pivot column '{}' on '{}'",
                self.pivot_column, table.graphql_name
            ))
        })?;
        let value_col = table.column_by_graphql_name(&self.value_column).ok_or_else(|| {
            CompileError::schema_lookup(format!(
                "unknown value column '{}' on '{}'",
                self.value_column, table.graphql_name
            ))
        })?;
        let group_cols: Vec<&str> = {
            let mut cols = Vec::with_capacity(self.group_by.len());
            for name in &self.group_by {
                let col = table.column_by_graphql_name(name).ok_or_else(|| {
                    CompileError::schema_lookup(format!(
                        "unknown group-by column '{name}' on '{}'",
                        table.graphql_name
                    ))
                })?;
                cols.push(col.db_name.as_str());
            }
            cols
        };

        match dialect_kind {
            DialectKind::SqlServer => self.native_pivot_sql(
                dialect,
                table.db_name.as_str(),
                &group_cols,
                &pivot_col.db_name,
                &value_col.db_name,
                schema,
                table,
                params,
            ),
            _ => self.case_when_sql(
                dialect,
                table.db_name.as_str(),
                &group_cols,
                &pivot_col.db_name,
                &value_col.db_name,
                schema,
                table,
                params,
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn native_pivot_sql(
        &self,
        dialect: &dyn Dialect,
        table_db_name: &str,
        group_cols: &[&str],
        pivot_col: &str,
        value_col: &str,
        schema: &SchemaModel,
        table: &crate::schema::Table,
        params: &ParameterCollection,
    ) -> Result<ParameterizedSql> {
        let from = dialect.table_reference(table.schema.as_deref(), table_db_name);
        let where_clause = self
            .filter
            .get_filter_sql_parameterized(table, schema, dialect, params)?;

        let pivot_list = self
            .pivot_values
            .iter()
            .map(render_pivot_value)
            .collect::<Vec<_>>()
            .join(", ");

        let select_cols = group_cols
            .iter()
            .map(|c| dialect.escape_identifier(c))
            .chain(
                self.pivot_values
                    .iter()
                    .map(|v| dialect.escape_identifier(&pivot_label(v, &self.null_label))),
            )
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "SELECT {select_cols} FROM (SELECT {} FROM {from}{}) AS {} PIVOT ({}({}) FOR {} IN ({pivot_list})) AS pivoted",
            group_cols
                .iter()
                .map(|c| dialect.escape_identifier(c))
                .chain(std::iter::once(dialect.escape_identifier(pivot_col)))
                .chain(std::iter::once(dialect.escape_identifier(value_col)))
                .collect::<Vec<_>>()
                .join(", "),
            where_clause.sql,
            dialect.escape_identifier("src"),
            self.aggregate.to_string().to_uppercase(),
            dialect.escape_identifier(value_col),
            dialect.escape_identifier(pivot_col),
        );

        Ok(ParameterizedSql::with_parameters(sql, where_clause.parameters))
    }

    #[allow(clippy::too_many_arguments)]
    fn case_when_sql(
        &self,
        dialect: &dyn Dialect,
        table_db_name: &str,
        group_cols: &[&str],
        pivot_col: &str,
        value_col: &str,
        schema: &SchemaModel,
        table: &crate::schema::Table,
        params: &ParameterCollection,
    ) -> Result<ParameterizedSql> {
        let from = dialect.table_reference(table.schema.as_deref(), table_db_name);
        let where_clause = self
            .filter
            .get_filter_sql_parameterized(table, schema, dialect, params)?;

        let group_select = group_cols
            .iter()
            .map(|c| dialect.escape_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");

        let func = self.aggregate.to_string().to_uppercase();
        let case_columns = self
            .pivot_values
            .iter()
            .map(|pv| {
                let label = pivot_label(pv, &self.null_label);
                let condition = match pv {
                    Value::Null => format!("{} IS NULL", dialect.escape_identifier(pivot_col)),
                    other => format!(
                        "{} = {}",
                        dialect.escape_identifier(pivot_col),
                        render_pivot_value(other)
                    ),
                };
                format!(
                    "{func}(CASE WHEN {condition} THEN {} END) AS {}",
                    dialect.escape_identifier(value_col),
                    dialect.escape_identifier(&label)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        let select_list = if group_select.is_empty() {
            case_columns
        } else {
            format!("{group_select}, {case_columns}")
        };

        let mut sql = format!("SELECT {select_list} FROM {from}{}", where_clause.sql);
        if !group_cols.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&group_select);
        }

        Ok(ParameterizedSql::with_parameters(sql, where_clause.parameters))
    }
}

/// Pivot values are rendered as SQL literals, not bound parameters —
/// they become identifiers (column aliases/`IN` list entries), which
/// can't be parameter placeholders in any of the four dialects.
fn render_pivot_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "NULL".to_string(),
        Value::List(_) | Value::Map(_) => "NULL".to_string(),
    }
}

fn pivot_label(value: &Value, null_label: &str) -> String {
    match value {
        Value::Null => null_label.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
