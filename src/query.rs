//! `ObjectQuery` (C6): a single compiled unit of work — one selectable
//! table, its filter/sort/page window, and the linked queries connected
//! under it (`spec.md` §3/§4.6).
//!
//! A query compiles to a *statement map* keyed per `spec.md` §6: the
//! main `SELECT` under its own key name, an optional `KeyName=>count`
//! sibling, one `parent_path->alias_or_name` statement per connected
//! link, and one `path=>agg_name` statement per relation-traversing
//! aggregate — all sharing one `ParameterCollection` so parameter names
//! stay unique across the whole compile (`spec.md` §5).

use indexmap::IndexMap;

use crate::dialect::{Dialect, SortColumn, SortDirection};
use crate::error::{CompileError, Result};
use crate::filter::Filter;
use crate::params::{Parameter, ParameterCollection, ParameterizedSql};
use crate::schema::{SchemaModel, Table};

/// `spec.md` §3: a query either stands alone (root list), connects to a
/// parent as a to-many relation (`Join`), or connects as a to-one
/// relation or a root `_primaryKey` lookup (`Single`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Standard,
    Join,
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "PascalCase")]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

/// One relation-traversing aggregate projection (`spec.md` §4.6): the
/// aggregate function runs over a scalar column reached by walking one
/// or more relation hops from this node, joined back on `JoinId`.
/// Emitted as its own sibling statement, never folded into the owning
/// node's main `SELECT`.
#[derive(Debug, Clone)]
pub struct AggregateColumn {
    pub alias: Option<String>,
    pub function: AggregateFn,
    /// One or more relation names to walk, in order, from this node.
    pub relation_path: Vec<String>,
    /// The scalar column on the final table in the chain. `None` only
    /// for a bare `Count`.
    pub column: Option<String>,
}

impl AggregateColumn {
    fn final_name(&self) -> String {
        self.alias.clone().unwrap_or_else(|| "_agg".to_string())
    }
}

/// How a connected link's `from_column`/`connected_column` pair was
/// resolved (`spec.md` §4.6).
#[derive(Debug, Clone)]
enum JoinKind {
    /// Parent → many children, discovered via the parent's multi-link.
    Multi,
    /// Child → one parent, discovered via the child's single-link.
    Single,
    /// Traverses a junction table.
    ManyToMany {
        junction_table: String,
        junction_source_column: String,
        junction_target_column: String,
    },
    /// A `_join_`-prefixed dynamic join with a caller-supplied column
    /// pair and comparison operator, no schema relation involved.
    Dynamic,
}

/// A resolved connection from a parent `ObjectQuery` to a nested one:
/// the join condition plus the nested query itself.
#[derive(Debug, Clone)]
struct ResolvedJoin {
    alias_or_name: String,
    from_column: String,
    connected_column: String,
    operator: String,
    kind: JoinKind,
    query_type: QueryType,
    query: ObjectQuery,
}

/// The outcome of resolving a relation name against a table: which kind
/// of hop it is and the column pair a pin-set join needs.
struct HopResolution {
    kind: JoinKind,
    related_table: String,
    from_column: String,
    connected_column: String,
}

fn resolve_hop(table: &Table, relation: &str) -> Result<HopResolution> {
    if let Some(r) = table.multi_link(relation) {
        return Ok(HopResolution {
            kind: JoinKind::Multi,
            related_table: r.child_table.clone(),
            from_column: r.parent_column.clone(),
            connected_column: r.child_column.clone(),
        });
    }
    if let Some(r) = table.single_link(relation) {
        return Ok(HopResolution {
            kind: JoinKind::Single,
            related_table: r.parent_table.clone(),
            from_column: r.child_column.clone(),
            connected_column: r.parent_column.clone(),
        });
    }
    if let Some(r) = table.many_to_many_link(relation) {
        return Ok(HopResolution {
            kind: JoinKind::ManyToMany {
                junction_table: r.junction_table.clone(),
                junction_source_column: r.junction_source_column.clone(),
                junction_target_column: r.junction_target_column.clone(),
            },
            related_table: r.target_table.clone(),
            from_column: r.source_column.clone(),
            connected_column: r.target_column.clone(),
        });
    }
    Err(CompileError::execution(format!("Unable to find join '{relation}'")))
}

/// Parses a `column_asc`/`column_desc` sort token (`spec.md` §4.6).
pub fn parse_sort_token(table: &Table, token: &str) -> Result<SortColumn> {
    let (column, direction) = if let Some(c) = token.strip_suffix("_asc") {
        (c, SortDirection::Asc)
    } else if let Some(c) = token.strip_suffix("_desc") {
        (c, SortDirection::Desc)
    } else {
        return Err(CompileError::not_supported(format!(
            "sort token '{token}' must end in '_asc' or '_desc'"
        )));
    };

    let col = table.column_by_graphql_name(column).ok_or_else(|| {
        CompileError::schema_lookup(format!(
            "unknown sort column '{column}' on '{}'",
            table.graphql_name
        ))
    })?;

    Ok(SortColumn {
        column: col.db_name.clone(),
        direction,
    })
}

/// A join fragment scoping a connected node's own table down to the
/// rows actually reachable from the root — the ancestor half of
/// `spec.md` §4.6's "pin set is itself an inner join into grandparent
/// pin set" rule. `None` at the root.
struct AncestorScope {
    alias: String,
    pin: ParameterizedSql,
    connected_column: String,
}

/// One compiled query node: its own window over `table`, plus connected
/// links and relation-traversing aggregates (`spec.md` §4.6).
#[derive(Debug, Clone)]
pub struct ObjectQuery {
    pub table: String,
    pub alias: Option<String>,
    pub query_type: QueryType,
    pub filter: Filter,
    pub sort: Vec<SortColumn>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub scalar_columns: Vec<String>,
    pub aggregate_columns: Vec<AggregateColumn>,
    pub include_result: bool,
    joins: Vec<ResolvedJoin>,
}

impl ObjectQuery {
    pub fn new(table: impl Into<String>, query_type: QueryType) -> Self {
        Self {
            table: table.into(),
            alias: None,
            query_type,
            filter: Filter::And(vec![]),
            sort: Vec::new(),
            limit: None,
            offset: None,
            scalar_columns: Vec::new(),
            aggregate_columns: Vec::new(),
            include_result: false,
            joins: Vec::new(),
        }
    }

    /// Resolves `relation` against this query's table's schema relations
    /// (single-link, multi-link, many-to-many) and connects `nested`
    /// under it. Fails with `ExecutionError` when no such relation
    /// exists (`spec.md` §4.6, "Unable to find join").
    pub fn connect_links(
        &mut self,
        schema: &SchemaModel,
        relation: &str,
        alias: Option<String>,
        nested: ObjectQuery,
    ) -> Result<()> {
        let table = schema.table_by_db_name(&self.table).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", self.table))
        })?;
        let hop = resolve_hop(table, relation)?;
        let query_type = match hop.kind {
            JoinKind::Single => QueryType::Single,
            _ => QueryType::Join,
        };
        let mut nested = nested;
        nested.query_type = query_type;
        self.joins.push(ResolvedJoin {
            alias_or_name: alias.unwrap_or_else(|| relation.to_string()),
            from_column: hop.from_column,
            connected_column: hop.connected_column,
            operator: "=".to_string(),
            kind: hop.kind,
            query_type,
            query: nested,
        });
        Ok(())
    }

    /// Connects a `_join_`-prefixed dynamic join: the caller supplies
    /// the column pair and comparison operator explicitly rather than
    /// relying on a schema-discovered relation (`spec.md` §4.6/§4.7).
    pub fn connect_dynamic_join(
        &mut self,
        relation_name: &str,
        alias: Option<String>,
        from_column: impl Into<String>,
        operator: impl Into<String>,
        connected_column: impl Into<String>,
        mut nested: ObjectQuery,
    ) {
        nested.query_type = QueryType::Join;
        self.joins.push(ResolvedJoin {
            alias_or_name: alias.unwrap_or_else(|| relation_name.to_string()),
            from_column: from_column.into(),
            connected_column: connected_column.into(),
            operator: operator.into(),
            kind: JoinKind::Dynamic,
            query_type: QueryType::Join,
            query: nested,
        });
    }

    pub fn links(&self) -> impl Iterator<Item = (&str, &ObjectQuery)> {
        self.joins.iter().map(|j| (j.alias_or_name.as_str(), &j.query))
    }

    fn key_name(&self, table: &Table) -> String {
        self.alias.clone().unwrap_or_else(|| table.graphql_name.clone())
    }

    fn select_list(&self, table: &Table, dialect: &dyn Dialect) -> Result<String> {
        if self.scalar_columns.is_empty() {
            return Ok(format!("{}.*", dialect.escape_identifier(&table.db_name)));
        }

        let mut parts = Vec::with_capacity(self.scalar_columns.len());
        for graphql_name in &self.scalar_columns {
            let col = table.column_by_graphql_name(graphql_name).ok_or_else(|| {
                CompileError::schema_lookup(format!(
                    "unknown column '{graphql_name}' on '{}'",
                    table.graphql_name
                ))
            })?;
            parts.push(format!(
                "{}.{}",
                dialect.escape_identifier(&table.db_name),
                dialect.escape_identifier(&col.db_name)
            ));
        }
        Ok(parts.join(", "))
    }

    /// Compiles the main `SELECT` for this node alone, with no
    /// connected links or aggregate siblings.
    pub fn to_sql_parameterized(
        &self,
        schema: &SchemaModel,
        dialect: &dyn Dialect,
        params: &ParameterCollection,
    ) -> Result<ParameterizedSql> {
        let table = schema.table_by_db_name(&self.table).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", self.table))
        })?;

        let select_list = self.select_list(table, dialect)?;
        let from = dialect.table_reference(table.schema.as_deref(), &table.db_name);
        let where_clause = self
            .filter
            .get_filter_sql_parameterized(table, schema, dialect, params)?;

        let mut sql = format!("SELECT {select_list} FROM {from}{}", where_clause.sql);
        let parameters = where_clause.parameters;

        let sort: Vec<SortColumn> = self
            .sort
            .iter()
            .map(|s| SortColumn {
                column: format!(
                    "{}.{}",
                    dialect.escape_identifier(&table.db_name),
                    s.column
                ),
                direction: s.direction,
            })
            .collect();

        match self.query_type {
            QueryType::Single => {
                sql.push_str(&dialect.pagination(&sort, None, Some(1)));
            }
            QueryType::Standard | QueryType::Join => {
                sql.push_str(&dialect.pagination(&sort, self.offset, self.limit));
            }
        }

        Ok(ParameterizedSql::with_parameters(sql, parameters))
    }

    /// Compiles the `COUNT(*)` sibling used for pagination totals —
    /// same `FROM`/`WHERE`, no `ORDER BY`/`LIMIT`/`OFFSET`.
    pub fn to_count_sql_parameterized(
        &self,
        schema: &SchemaModel,
        dialect: &dyn Dialect,
        params: &ParameterCollection,
    ) -> Result<ParameterizedSql> {
        let table = schema.table_by_db_name(&self.table).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", self.table))
        })?;
        let from = dialect.table_reference(table.schema.as_deref(), &table.db_name);
        let where_clause = self
            .filter
            .get_filter_sql_parameterized(table, schema, dialect, params)?;
        Ok(ParameterizedSql::with_parameters(
            format!("SELECT COUNT(*) FROM {from}{}", where_clause.sql),
            where_clause.parameters,
        ))
    }

    /// The `FROM` fragment for this node's own table, optionally scoped
    /// down to the rows reachable from an ancestor's pin set.
    fn from_with_ancestor(
        &self,
        table: &Table,
        dialect: &dyn Dialect,
        ancestor: Option<&AncestorScope>,
    ) -> (String, Vec<Parameter>) {
        let base = dialect.table_reference(table.schema.as_deref(), &table.db_name);
        match ancestor {
            None => (format!("FROM {base}"), Vec::new()),
            Some(a) => {
                let frag = format!(
                    "FROM {base} INNER JOIN ({}) AS {} ON {}.{} = {}.{}",
                    a.pin.sql,
                    dialect.escape_identifier(&a.alias),
                    dialect.escape_identifier(&table.db_name),
                    dialect.escape_identifier(&a.connected_column),
                    dialect.escape_identifier(&a.alias),
                    dialect.escape_identifier("joinid"),
                );
                (frag, a.pin.parameters.clone())
            }
        }
    }

    /// Builds the `SELECT DISTINCT {from_column} AS joinid …` pin-set
    /// subquery for a child relation of this node, scoped (via
    /// `ancestor`) to only the rows this node itself can reach
    /// (`spec.md` §4.6).
    fn pin_set(
        &self,
        schema: &SchemaModel,
        dialect: &dyn Dialect,
        params: &ParameterCollection,
        ancestor: Option<&AncestorScope>,
        from_column: &str,
    ) -> Result<ParameterizedSql> {
        let table = schema.table_by_db_name(&self.table).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", self.table))
        })?;
        let (from_clause, mut parameters) = self.from_with_ancestor(table, dialect, ancestor);
        let where_clause = self
            .filter
            .get_filter_sql_parameterized(table, schema, dialect, params)?;
        parameters.extend(where_clause.parameters);
        Ok(ParameterizedSql::with_parameters(
            format!(
                "SELECT DISTINCT {}.{} AS joinid {from_clause}{}",
                dialect.escape_identifier(&table.db_name),
                dialect.escape_identifier(from_column),
                where_clause.sql,
            ),
            parameters,
        ))
    }

    /// Compiles this node's whole statement map: main `SELECT`, count
    /// sibling (gated on `include_result`), one statement per connected
    /// link, and one per relation-traversing aggregate — keyed exactly
    /// as `spec.md` §6 describes.
    pub fn compile(
        &self,
        schema: &SchemaModel,
        dialect: &dyn Dialect,
        params: &ParameterCollection,
    ) -> Result<IndexMap<String, ParameterizedSql>> {
        let table = schema.table_by_db_name(&self.table).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", self.table))
        })?;
        let mut out = IndexMap::new();
        let key = self.key_name(table);
        self.emit(schema, dialect, params, &key, None, &mut out)?;
        Ok(out)
    }

    fn emit(
        &self,
        schema: &SchemaModel,
        dialect: &dyn Dialect,
        params: &ParameterCollection,
        path: &str,
        ancestor: Option<&AncestorScope>,
        out: &mut IndexMap<String, ParameterizedSql>,
    ) -> Result<()> {
        if schema.table_by_db_name(&self.table).is_none() {
            return Err(CompileError::schema_lookup(format!(
                "unknown table '{}'",
                self.table
            )));
        }

        // The root node's own SELECT is a plain statement; a connected
        // node's SELECT is emitted by `emit_join` instead, since it must
        // be joined against its parent's pin set. `ancestor.is_none()`
        // distinguishes the two without a separate flag.
        if ancestor.is_none() {
            out.insert(path.to_string(), self.to_sql_parameterized(schema, dialect, params)?);
            if self.include_result && matches!(self.query_type, QueryType::Standard | QueryType::Join) {
                out.insert(
                    format!("{path}=>count"),
                    self.to_count_sql_parameterized(schema, dialect, params)?,
                );
            }
        }

        for agg in &self.aggregate_columns {
            let key = format!("{path}=>agg_{}", agg.final_name());
            let stmt = self.emit_aggregate(schema, dialect, params, ancestor, agg)?;
            out.insert(key, stmt);
        }

        for join in &self.joins {
            let child_path = format!("{path}->{}", join.alias_or_name);
            let (pin, outer) = self.emit_join(schema, dialect, params, ancestor, join)?;
            out.insert(child_path.clone(), outer);

            let child_ancestor = AncestorScope {
                alias: format!("{}_pin", join.alias_or_name),
                pin,
                connected_column: join.connected_column.clone(),
            };
            join.query
                .emit(schema, dialect, params, &child_path, Some(&child_ancestor), out)?;
        }

        Ok(())
    }

    /// Builds one connected link's pin-set subquery and its outer
    /// `SELECT [a].[JoinId] AS src_id, [b].{…} FROM (pin) AS a INNER
    /// JOIN child ON …` statement (`spec.md` §4.6/§8 scenario 6).
    fn emit_join(
        &self,
        schema: &SchemaModel,
        dialect: &dyn Dialect,
        params: &ParameterCollection,
        ancestor: Option<&AncestorScope>,
        join: &ResolvedJoin,
    ) -> Result<(ParameterizedSql, ParameterizedSql)> {
        let pin = self.pin_set(schema, dialect, params, ancestor, &join.from_column)?;
        let pin_alias = format!("{}_pin", join.alias_or_name);

        let child_table = schema.table_by_db_name(&join.query.table).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", join.query.table))
        })?;

        let mut select_cols = vec![format!(
            "{}.joinid AS src_id",
            dialect.escape_identifier(&pin_alias)
        )];
        if join.query.scalar_columns.is_empty() {
            select_cols.push(format!("{}.*", dialect.escape_identifier(&child_table.db_name)));
        } else {
            for graphql_name in &join.query.scalar_columns {
                let col = child_table.column_by_graphql_name(graphql_name).ok_or_else(|| {
                    CompileError::schema_lookup(format!(
                        "unknown column '{graphql_name}' on '{}'",
                        child_table.graphql_name
                    ))
                })?;
                select_cols.push(format!(
                    "{}.{}",
                    dialect.escape_identifier(&child_table.db_name),
                    dialect.escape_identifier(&col.db_name)
                ));
            }
        }

        let mut from = format!(
            "FROM ({}) AS {} INNER JOIN {}",
            pin.sql,
            dialect.escape_identifier(&pin_alias),
            dialect.table_reference(child_table.schema.as_deref(), &child_table.db_name),
        );

        let mut parameters = pin.parameters.clone();

        match &join.kind {
            JoinKind::ManyToMany {
                junction_table,
                junction_source_column,
                junction_target_column,
            } => {
                from.push_str(&format!(
                    " ON {}.joinid {} {}.{} INNER JOIN {} ON {}.{} = {}.{}",
                    dialect.escape_identifier(&pin_alias),
                    join.operator,
                    dialect.escape_identifier(junction_table),
                    dialect.escape_identifier(junction_source_column),
                    dialect.table_reference(None, junction_table),
                    dialect.escape_identifier(junction_table),
                    dialect.escape_identifier(junction_target_column),
                    dialect.escape_identifier(&child_table.db_name),
                    dialect.escape_identifier(&join.connected_column),
                ));
            }
            _ => {
                from.push_str(&format!(
                    " ON {}.joinid {} {}.{}",
                    dialect.escape_identifier(&pin_alias),
                    join.operator,
                    dialect.escape_identifier(&child_table.db_name),
                    dialect.escape_identifier(&join.connected_column),
                ));
            }
        }

        let mut sql = format!("SELECT {} {from}", select_cols.join(", "));

        // Single-typed joins never carry the child's own filter, sort,
        // or pagination into the emitted SQL — the relation already
        // guarantees at most one matching row per parent.
        if matches!(join.query_type, QueryType::Join) {
            let where_clause = join
                .query
                .filter
                .get_filter_sql_parameterized(child_table, schema, dialect, params)?;
            sql.push_str(&where_clause.sql);
            parameters.extend(where_clause.parameters);

            let sort: Vec<SortColumn> = join
                .query
                .sort
                .iter()
                .map(|s| SortColumn {
                    column: format!(
                        "{}.{}",
                        dialect.escape_identifier(&child_table.db_name),
                        s.column
                    ),
                    direction: s.direction,
                })
                .collect();
            sql.push_str(&dialect.pagination(&sort, join.query.offset, join.query.limit));
        }

        Ok((pin, ParameterizedSql::with_parameters(sql, parameters)))
    }

    /// Builds the `KeyName=>agg_name` statement for one relation-
    /// traversing aggregate: a chain of `INNER JOIN`s over
    /// `relation_path`, each successive hop keyed on the prior hop's
    /// `JoinId`, ending in the aggregate function over the target
    /// column (`spec.md` §4.6).
    fn emit_aggregate(
        &self,
        schema: &SchemaModel,
        dialect: &dyn Dialect,
        params: &ParameterCollection,
        ancestor: Option<&AncestorScope>,
        agg: &AggregateColumn,
    ) -> Result<ParameterizedSql> {
        if agg.relation_path.is_empty() {
            return Err(CompileError::invalid_argument(
                "aggregate column requires at least one relation hop",
            ));
        }

        let root_table = schema.table_by_db_name(&self.table).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", self.table))
        })?;

        let first_hop = resolve_hop(root_table, &agg.relation_path[0])?;
        let root_pin_alias = format!("agg_{}_0", agg.final_name());
        let root_pin = self.pin_set(schema, dialect, params, ancestor, &first_hop.from_column)?;

        let mut from = format!(
            "FROM ({}) AS {}",
            root_pin.sql,
            dialect.escape_identifier(&root_pin_alias)
        );
        let mut parameters = root_pin.parameters.clone();

        let mut prev_alias = root_pin_alias.clone();
        let prev_connected = first_hop.connected_column.clone();
        let mut current_table = schema.table_by_db_name(&first_hop.related_table).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", first_hop.related_table))
        })?;

        from.push_str(&format!(
            " INNER JOIN {} ON {}.joinid = {}.{}",
            dialect.table_reference(current_table.schema.as_deref(), &current_table.db_name),
            dialect.escape_identifier(&prev_alias),
            dialect.escape_identifier(&current_table.db_name),
            dialect.escape_identifier(&prev_connected),
        ));
        prev_alias = current_table.db_name.clone();

        for relation in &agg.relation_path[1..] {
            let hop = resolve_hop(current_table, relation)?;
            let next_table = schema.table_by_db_name(&hop.related_table).ok_or_else(|| {
                CompileError::schema_lookup(format!("unknown table '{}'", hop.related_table))
            })?;
            from.push_str(&format!(
                " INNER JOIN {} ON {}.{} = {}.{}",
                dialect.table_reference(next_table.schema.as_deref(), &next_table.db_name),
                dialect.escape_identifier(&prev_alias),
                dialect.escape_identifier(&hop.from_column),
                dialect.escape_identifier(&next_table.db_name),
                dialect.escape_identifier(&hop.connected_column),
            ));
            prev_alias = next_table.db_name.clone();
            current_table = next_table;
        }

        let arg = match &agg.column {
            Some(column) => {
                let col = current_table.column_by_graphql_name(column).ok_or_else(|| {
                    CompileError::schema_lookup(format!(
                        "unknown aggregate column '{column}' on '{}'",
                        current_table.graphql_name
                    ))
                })?;
                format!(
                    "{}.{}",
                    dialect.escape_identifier(&current_table.db_name),
                    dialect.escape_identifier(&col.db_name)
                )
            }
            None => "*".to_string(),
        };
        if agg.column.is_none() && agg.function != AggregateFn::Count {
            return Err(CompileError::invalid_argument(format!(
                "aggregate '{}' requires a column",
                agg.function
            )));
        }

        let sql = format!(
            "SELECT {}.joinid AS src_id, {}({arg}) AS {} {from} GROUP BY {}.joinid",
            dialect.escape_identifier(&root_pin_alias),
            agg.function.to_string().to_uppercase(),
            dialect.escape_identifier(&agg.final_name()),
            dialect.escape_identifier(&root_pin_alias),
        );

        Ok(ParameterizedSql::with_parameters(sql, parameters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{dialect_for, DialectKind};
    use crate::schema::{ForeignKeyCatalog, RawColumn, RawForeignKey, RawTable};
    use crate::value::Value;

    fn sample_schema() -> SchemaModel {
        SchemaModel::from_foreign_key_catalog(ForeignKeyCatalog {
            tables: vec![
                RawTable {
                    db_name: "Users".into(),
                    graphql_name: "Users".into(),
                    schema: None,
                    columns: vec![
                        RawColumn {
                            db_name: "Id".into(),
                            graphql_name: "id".into(),
                            data_type: "int".into(),
                            is_primary_key: true,
                            is_nullable: false,
                        },
                        RawColumn {
                            db_name: "Name".into(),
                            graphql_name: "name".into(),
                            data_type: "text".into(),
                            is_primary_key: false,
                            is_nullable: true,
                        },
                    ],
                },
                RawTable {
                    db_name: "Orders".into(),
                    graphql_name: "Orders".into(),
                    schema: None,
                    columns: vec![
                        RawColumn {
                            db_name: "Id".into(),
                            graphql_name: "id".into(),
                            data_type: "int".into(),
                            is_primary_key: true,
                            is_nullable: false,
                        },
                        RawColumn {
                            db_name: "UserId".into(),
                            graphql_name: "userId".into(),
                            data_type: "int".into(),
                            is_primary_key: false,
                            is_nullable: false,
                        },
                        RawColumn {
                            db_name: "Total".into(),
                            graphql_name: "total".into(),
                            data_type: "real".into(),
                            is_primary_key: false,
                            is_nullable: false,
                        },
                    ],
                },
            ],
            foreign_keys: vec![RawForeignKey {
                child_table: "Orders".into(),
                child_column: "UserId".into(),
                parent_table: "Users".into(),
                parent_column: "Id".into(),
            }],
        })
        .unwrap()
    }

    #[test]
    fn plain_list_query_paginates() {
        let schema = sample_schema();
        let dialect = dialect_for(DialectKind::Postgres);
        let params = ParameterCollection::new("@");
        let mut q = ObjectQuery::new("Users", QueryType::Standard);
        q.limit = Some(10);
        q.offset = Some(0);

        let sql = q.to_sql_parameterized(&schema, dialect, &params).unwrap();
        assert_eq!(sql.sql, "SELECT \"Users\".* FROM \"Users\" LIMIT 10");
    }

    #[test]
    fn single_query_forces_limit_one() {
        let schema = sample_schema();
        let dialect = dialect_for(DialectKind::Postgres);
        let params = ParameterCollection::new("@");
        let mut q = ObjectQuery::new("Users", QueryType::Single);
        q.filter = Filter::from_primary_key(
            schema.table_by_db_name("Users").unwrap(),
            &[Value::Int(1)],
        )
        .unwrap();

        let sql = q.to_sql_parameterized(&schema, dialect, &params).unwrap();
        assert!(sql.sql.ends_with("LIMIT 1"));
        assert_eq!(sql.parameters.len(), 1);
    }

    #[test]
    fn include_result_gates_the_count_sibling() {
        let schema = sample_schema();
        let dialect = dialect_for(DialectKind::SqlServer);
        let params = ParameterCollection::new("@");
        let mut q = ObjectQuery::new("Users", QueryType::Standard);
        q.include_result = false;
        let statements = q.compile(&schema, dialect, &params).unwrap();
        assert_eq!(statements.len(), 1);
        assert!(!statements.contains_key("Users=>count"));

        let mut q2 = ObjectQuery::new("Users", QueryType::Standard);
        q2.include_result = true;
        let statements2 = q2.compile(&schema, dialect, &params).unwrap();
        assert!(statements2.contains_key("Users=>count"));
    }

    #[test]
    fn multi_link_join_pins_and_correlates_on_sqlserver() {
        let schema = sample_schema();
        let dialect = dialect_for(DialectKind::SqlServer);
        let params = ParameterCollection::new("@");
        let mut q = ObjectQuery::new("Users", QueryType::Standard);
        let mut nested = ObjectQuery::new("Orders", QueryType::Standard);
        nested.scalar_columns = vec!["id".to_string(), "total".to_string()];
        q.connect_links(&schema, "orders", None, nested).unwrap();

        let statements = q.compile(&schema, dialect, &params).unwrap();
        let joined = statements.get("Users->orders").expect("join statement present");

        assert!(joined.sql.contains("INNER JOIN"));
        assert!(joined.sql.contains("[Orders]"));
        assert!(joined.sql.contains("SELECT DISTINCT [Users].[Id] AS joinid"));
        assert!(joined.sql.contains("[orders_pin].joinid AS src_id"));
        assert!(joined.sql.contains("[Orders].[Id]"));
        assert!(joined.sql.contains("[Orders].[Total]"));
    }

    #[test]
    fn unknown_link_relation_errors() {
        let schema = sample_schema();
        let mut q = ObjectQuery::new("Users", QueryType::Standard);
        let nested = ObjectQuery::new("Orders", QueryType::Standard);
        let err = q.connect_links(&schema, "bogus", None, nested).unwrap_err();
        assert!(matches!(err, CompileError::ExecutionError { .. }));
    }

    #[test]
    fn aggregate_column_joins_through_one_hop() {
        let schema = sample_schema();
        let dialect = dialect_for(DialectKind::Postgres);
        let params = ParameterCollection::new("@");
        let mut q = ObjectQuery::new("Users", QueryType::Standard);
        q.aggregate_columns.push(AggregateColumn {
            alias: Some("orderTotal".to_string()),
            function: AggregateFn::Sum,
            relation_path: vec!["orders".to_string()],
            column: Some("total".to_string()),
        });

        let statements = q.compile(&schema, dialect, &params).unwrap();
        let agg = statements.get("Users=>agg_orderTotal").expect("aggregate statement present");
        assert!(agg.sql.contains("SUM(\"Orders\".\"Total\")"));
        assert!(agg.sql.contains("GROUP BY"));
    }
}
