//! `RequestAdapter` (C7): lowering a GraphQL selection into the
//! compiler's own `ObjectQuery`/`Filter` trees, and the reversible
//! transport DTO used to carry that lowered shape across a process
//! boundary (`spec.md` §4.7).
//!
//! `QueryField` is generic over the caller's own GraphQL AST node type
//! so this crate never depends on a specific GraphQL implementation —
//! callers implement `FromQueryField`/`ToQueryField` once for whatever
//! AST their GraphQL layer hands them. A selection whose name starts
//! with `...` names a fragment to splice in place (`spec.md` §4.7,
//! "fragment expansion"); one prefixed `_join_` names a dynamic join
//! rather than a schema relation, carrying its own column pair and
//! comparison operator as arguments instead of relying on FK discovery.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::error::{CompileError, Result};
use crate::filter::Filter;
use crate::primary_key::ParameterPrimaryKey;
use crate::query::{ObjectQuery, QueryType};
use crate::schema::{SchemaModel, Table};
use crate::value::Value;

/// Marks a selection as a named-fragment spread rather than a real
/// field — the GraphQL text spelling, `...FragmentName`.
pub const FRAGMENT_SPREAD_PREFIX: &str = "...";

/// Marks a selection as a caller-defined dynamic join rather than a
/// schema-discovered relation.
pub const DYNAMIC_JOIN_PREFIX: &str = "_join_";

/// A minimal, GraphQL-implementation-agnostic view of one selected
/// field: its name, arguments, an optional alias, and its own nested
/// selections. Callers adapt their real AST into this shape via
/// `ToQueryField`.
#[derive(Debug, Clone, Default)]
pub struct QueryField {
    pub name: String,
    pub alias: Option<String>,
    pub arguments: IndexMap<String, Value>,
    pub selections: Vec<QueryField>,
}

/// Converts a caller's native GraphQL AST node into a `QueryField`.
pub trait ToQueryField {
    fn to_query_field(&self) -> QueryField;
}

/// The reverse direction: builds a caller's native AST node back from
/// a `QueryField` — used when a compiled plan needs to be replayed
/// against a different GraphQL runtime than the one that produced it.
pub trait FromQueryField: Sized {
    fn from_query_field(field: &QueryField) -> Result<Self>;
}

/// Named fragments available to a lowering pass, keyed by fragment
/// name, each holding its own flat selection set.
pub type Fragments = IndexMap<String, Vec<QueryField>>;

/// The GraphQL operation kind a `QueryIntent` was lowered from
/// (`spec.md` §6). Orthogonal to `ObjectQuery`'s `QueryType`, which is
/// re-derived from schema relations on replay rather than carried
/// across the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Query,
    Mutation,
    Subscription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryIntentKind {
    Standard,
    Join,
    Single,
}

/// `serde_json::Value` re-exported under this module's own name so
/// `QueryIntent`'s derive doesn't force callers to depend on
/// `serde_json` directly just to read this struct's field types.
pub type JsonValue = serde_json::Value;

/// A reversible, serde-serializable snapshot of one lowered query,
/// suitable for shipping across a process boundary (`spec.md` §4.7,
/// "transport DTO"). Round-trips through `ObjectQuery` via
/// `RequestAdapter::lower`/`RequestAdapter::from_intent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryIntent {
    pub request_type: RequestType,
    pub table: Option<String>,
    pub alias: Option<String>,
    pub query_type: QueryIntentKind,
    /// The name of the relation this node is connected under its
    /// parent by — `None` at the root. Needed to replay `joins` back
    /// through `ObjectQuery::connect_links`, since a relation's name
    /// (e.g. a single-link's normalized column prefix) doesn't always
    /// match its target table's GraphQL name.
    pub relation: Option<String>,
    /// The merged `where`/`_primaryKey` filter, expressed in the same
    /// JSON shape `Filter::from_object` parses — never the two
    /// arguments kept separate, so a replayed intent can't silently
    /// drop the primary-key half of the merge.
    pub filter: Option<JsonValue>,
    pub fields: Vec<String>,
    pub arguments: IndexMap<String, JsonValue>,
    pub joins: Vec<QueryIntent>,
}

/// Lowers GraphQL selections into this crate's own query tree and
/// performs the inverse: replaying a previously-lowered `QueryIntent`.
pub struct RequestAdapter<'s> {
    schema: &'s SchemaModel,
}

fn relation_target_table<'a>(schema: &'a SchemaModel, table: &Table, relation: &str) -> Result<&'a Table> {
    let db_name = if let Some(r) = table.single_link(relation) {
        r.parent_table.clone()
    } else if let Some(r) = table.multi_link(relation) {
        r.child_table.clone()
    } else if let Some(r) = table.many_to_many_link(relation) {
        r.target_table.clone()
    } else {
        return Err(CompileError::schema_lookup(format!(
            "unknown relation '{relation}' on '{}'",
            table.graphql_name
        )));
    };
    schema
        .table_by_db_name(&db_name)
        .ok_or_else(|| CompileError::schema_lookup(format!("unknown table '{db_name}'")))
}

/// Expands fragment spreads in `selections` into a flat list of real
/// field selections, detecting cyclic spreads (`spec.md` §4.7).
fn expand_selections<'a>(
    selections: &'a [QueryField],
    fragments: &Fragments,
    visited: &mut HashSet<String>,
) -> Result<Vec<&'a QueryField>> {
    let mut out = Vec::new();
    for selection in selections {
        match selection.name.strip_prefix(FRAGMENT_SPREAD_PREFIX) {
            Some(fragment_name) => {
                if !visited.insert(fragment_name.to_string()) {
                    return Err(CompileError::invalid_argument(format!(
                        "cyclic fragment spread on '{fragment_name}'"
                    )));
                }
                let fragment_fields = fragments.get(fragment_name).ok_or_else(|| {
                    CompileError::invalid_argument(format!("unknown fragment '{fragment_name}'"))
                })?;
                out.extend(expand_selections(fragment_fields, fragments, visited)?);
                visited.remove(fragment_name);
            }
            None => out.push(selection),
        }
    }
    Ok(out)
}

/// Reconstructs the same `{ column: { _op: value } }` / `and`/`or` /
/// relation shape `Filter::from_object` parses, so a merged filter can
/// round-trip through `QueryIntent` as plain JSON.
fn filter_to_json(filter: &Filter) -> JsonValue {
    match filter {
        Filter::Column { column, op, value } => {
            let mut op_obj = Map::new();
            op_obj.insert(format!("_{op}"), JsonValue::from(value.clone()));
            let mut obj = Map::new();
            obj.insert(column.clone(), JsonValue::Object(op_obj));
            JsonValue::Object(obj)
        }
        Filter::Relation { relation, filter } => {
            let mut obj = Map::new();
            obj.insert(relation.clone(), filter_to_json(filter));
            JsonValue::Object(obj)
        }
        Filter::And(items) => {
            let mut obj = Map::new();
            obj.insert(
                "and".to_string(),
                JsonValue::Array(items.iter().map(filter_to_json).collect()),
            );
            JsonValue::Object(obj)
        }
        Filter::Or(items) => {
            let mut obj = Map::new();
            obj.insert(
                "or".to_string(),
                JsonValue::Array(items.iter().map(filter_to_json).collect()),
            );
            JsonValue::Object(obj)
        }
    }
}

impl<'s> RequestAdapter<'s> {
    pub fn new(schema: &'s SchemaModel) -> Self {
        Self { schema }
    }

    /// Lowers one selected field (assumed to name a table) into an
    /// `ObjectQuery`, recursively connecting any nested relation
    /// selections as linked queries. No fragments available to spread.
    pub fn lower(&self, field: &QueryField, query_type: QueryType) -> Result<ObjectQuery> {
        self.lower_with_fragments(field, query_type, &Fragments::new())
    }

    pub fn lower_with_fragments(
        &self,
        field: &QueryField,
        query_type: QueryType,
        fragments: &Fragments,
    ) -> Result<ObjectQuery> {
        let table = self.schema.table_by_graphql_name(&field.name).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", field.name))
        })?;
        self.lower_into_table(field, table, query_type, fragments)
    }

    fn lower_into_table(
        &self,
        field: &QueryField,
        table: &Table,
        query_type: QueryType,
        fragments: &Fragments,
    ) -> Result<ObjectQuery> {
        let mut query = ObjectQuery::new(table.db_name.clone(), query_type);
        query.alias = field.alias.clone();

        query.filter = self.merge_filter(table, field)?.unwrap_or(Filter::And(vec![]));

        if let Some(limit) = field.arguments.get("limit").and_then(Value::as_i64) {
            query.limit = Some(limit);
        }
        if let Some(offset) = field.arguments.get("offset").and_then(Value::as_i64) {
            query.offset = Some(offset);
        }
        if matches!(field.arguments.get("includeResult"), Some(Value::Bool(true))) {
            query.include_result = true;
        }

        if let Some(Value::List(tokens)) = field.arguments.get("sort") {
            for token in tokens {
                if let Some(token_str) = token.as_str() {
                    query.sort.push(crate::query::parse_sort_token(table, token_str)?);
                }
            }
        }

        let mut visited = HashSet::new();
        let expanded = expand_selections(&field.selections, fragments, &mut visited)?;

        for selection in expanded {
            if let Some(relation_name) = selection.name.strip_prefix(DYNAMIC_JOIN_PREFIX) {
                let target_table_name = selection.arguments.get("table").and_then(Value::as_str).ok_or_else(|| {
                    CompileError::invalid_argument(format!(
                        "dynamic join '{}' requires a 'table' argument",
                        selection.name
                    ))
                })?;
                let from_column = selection.arguments.get("fromColumn").and_then(Value::as_str).ok_or_else(|| {
                    CompileError::invalid_argument(format!(
                        "dynamic join '{}' requires a 'fromColumn' argument",
                        selection.name
                    ))
                })?;
                let connected_column = selection
                    .arguments
                    .get("connectedColumn")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        CompileError::invalid_argument(format!(
                            "dynamic join '{}' requires a 'connectedColumn' argument",
                            selection.name
                        ))
                    })?;
                let operator = selection.arguments.get("operator").and_then(Value::as_str).unwrap_or("=");

                let mut synthetic = selection.clone();
                synthetic.name = target_table_name.to_string();
                let nested = self.lower_with_fragments(&synthetic, QueryType::Join, fragments)?;
                query.connect_dynamic_join(
                    relation_name,
                    selection.alias.clone(),
                    from_column,
                    operator,
                    connected_column,
                    nested,
                );
                continue;
            }

            if table.column_by_graphql_name(&selection.name).is_some() {
                query.scalar_columns.push(selection.name.clone());
                continue;
            }

            if table.single_link(&selection.name).is_some()
                || table.multi_link(&selection.name).is_some()
                || table.many_to_many_link(&selection.name).is_some()
            {
                let nested_table = relation_target_table(self.schema, table, &selection.name)?;
                let nested = self.lower_into_table(selection, nested_table, QueryType::Standard, fragments)?;
                query.connect_links(self.schema, &selection.name, selection.alias.clone(), nested)?;
            }
        }

        Ok(query)
    }

    /// Parses `where` and `_primaryKey` and combines them via
    /// `ParameterPrimaryKey::merge_with` — `_primaryKey` never silently
    /// overwrites an existing filter (`spec.md` §4.7/§8).
    fn merge_filter(&self, table: &Table, field: &QueryField) -> Result<Option<Filter>> {
        let existing = match field.arguments.get("where") {
            Some(Value::Map(where_obj)) => Some(Filter::from_object(table, self.schema, where_obj)?),
            _ => None,
        };

        match field.arguments.get("_primaryKey") {
            Some(pk) => {
                let values = match pk {
                    Value::List(items) => items.clone(),
                    other => vec![other.clone()],
                };
                let merged = match existing {
                    Some(extra) => ParameterPrimaryKey::merge_with(table, &values, extra)?.into_filter(),
                    None => Filter::from_primary_key(table, &values)?,
                };
                Ok(Some(merged))
            }
            None => Ok(existing),
        }
    }

    /// Serializes a lowered query field back out as a `QueryIntent`,
    /// without compiling it. Argument values go through
    /// `serde_json::Value` so the DTO stays serde-native at its edges.
    pub fn to_intent(&self, field: &QueryField, request_type: RequestType, query_type: QueryType) -> Result<QueryIntent> {
        self.to_intent_with_fragments(field, request_type, query_type, None, &Fragments::new())
    }

    fn to_intent_with_fragments(
        &self,
        field: &QueryField,
        request_type: RequestType,
        query_type: QueryType,
        relation: Option<String>,
        fragments: &Fragments,
    ) -> Result<QueryIntent> {
        let table = self.schema.table_by_graphql_name(&field.name).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{}'", field.name))
        })?;
        self.to_intent_into_table(field, table, request_type, query_type, relation, fragments)
    }

    fn to_intent_into_table(
        &self,
        field: &QueryField,
        table: &Table,
        request_type: RequestType,
        query_type: QueryType,
        relation: Option<String>,
        fragments: &Fragments,
    ) -> Result<QueryIntent> {
        let mut visited = HashSet::new();
        let expanded = expand_selections(&field.selections, fragments, &mut visited)?;

        let mut fields = Vec::new();
        let mut joins = Vec::new();
        for selection in expanded {
            if let Some(relation_name) = selection.name.strip_prefix(DYNAMIC_JOIN_PREFIX) {
                let target_table_name = selection.arguments.get("table").and_then(Value::as_str).ok_or_else(|| {
                    CompileError::invalid_argument(format!(
                        "dynamic join '{}' requires a 'table' argument",
                        selection.name
                    ))
                })?;
                let target_table = self.schema.table_by_graphql_name(target_table_name).ok_or_else(|| {
                    CompileError::schema_lookup(format!("unknown table '{target_table_name}'"))
                })?;
                joins.push(self.to_intent_into_table(
                    selection,
                    target_table,
                    request_type,
                    QueryType::Join,
                    Some(relation_name.to_string()),
                    fragments,
                )?);
                continue;
            }

            if table.column_by_graphql_name(&selection.name).is_some() {
                fields.push(selection.name.clone());
            } else if table.single_link(&selection.name).is_some()
                || table.multi_link(&selection.name).is_some()
                || table.many_to_many_link(&selection.name).is_some()
            {
                let nested_table = relation_target_table(self.schema, table, &selection.name)?;
                joins.push(self.to_intent_into_table(
                    selection,
                    nested_table,
                    request_type,
                    QueryType::Standard,
                    Some(selection.name.clone()),
                    fragments,
                )?);
            }
        }

        let arguments = field
            .arguments
            .iter()
            .filter(|(k, _)| k.as_str() != "where" && k.as_str() != "_primaryKey")
            .map(|(k, v)| (k.clone(), JsonValue::from(v.clone())))
            .collect();

        let filter = self.merge_filter(table, field)?.as_ref().map(filter_to_json);

        Ok(QueryIntent {
            request_type,
            table: Some(table.graphql_name.clone()),
            alias: field.alias.clone(),
            query_type: match query_type {
                QueryType::Standard => QueryIntentKind::Standard,
                QueryType::Join => QueryIntentKind::Join,
                QueryType::Single => QueryIntentKind::Single,
            },
            relation,
            filter,
            fields,
            arguments,
            joins,
        })
    }

    /// The inverse of `to_intent`: replays a `QueryIntent` into an
    /// `ObjectQuery` without needing the original GraphQL AST.
    pub fn from_intent(&self, intent: &QueryIntent) -> Result<ObjectQuery> {
        let table_name = intent
            .table
            .as_ref()
            .ok_or_else(|| CompileError::invalid_argument("QueryIntent is missing a table"))?;
        let table = self.schema.table_by_graphql_name(table_name).ok_or_else(|| {
            CompileError::schema_lookup(format!("unknown table '{table_name}'"))
        })?;

        let query_type = match intent.query_type {
            QueryIntentKind::Standard => QueryType::Standard,
            QueryIntentKind::Join => QueryType::Join,
            QueryIntentKind::Single => QueryType::Single,
        };
        let mut query = ObjectQuery::new(table.db_name.clone(), query_type);
        query.alias = intent.alias.clone();
        query.scalar_columns = intent.fields.clone();

        if let Some(filter_json) = &intent.filter {
            let filter_value = Value::from(filter_json.clone());
            if let Some(filter_obj) = filter_value.as_map() {
                query.filter = Filter::from_object(table, self.schema, filter_obj)?;
            }
        }

        for nested_intent in &intent.joins {
            let nested = self.from_intent(nested_intent)?;
            let relation_name = nested_intent.relation.as_ref().ok_or_else(|| {
                CompileError::invalid_argument("nested QueryIntent is missing its relation name")
            })?;
            query.connect_links(self.schema, relation_name, nested_intent.alias.clone(), nested)?;
        }

        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ForeignKeyCatalog, RawColumn, RawForeignKey, RawTable};

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
    fn lowers_field_with_where_and_selected_columns() {
        let schema = sample_schema();
        let adapter = RequestAdapter::new(&schema);

        let mut arguments = IndexMap::new();
        let mut name_op = IndexMap::new();
        name_op.insert("_eq".to_string(), Value::from("ada"));
        let mut where_obj = IndexMap::new();
        where_obj.insert("name".to_string(), Value::Map(name_op));
        arguments.insert("where".to_string(), Value::Map(where_obj));

        let field = QueryField {
            name: "Users".to_string(),
            alias: None,
            arguments,
            selections: vec![QueryField {
                name: "name".to_string(),
                ..Default::default()
            }],
        };

        let query = adapter.lower(&field, QueryType::Standard).unwrap();
        assert_eq!(query.scalar_columns, vec!["name".to_string()]);
    }

    #[test]
    fn primary_key_argument_is_and_merged_with_existing_where() {
        let schema = sample_schema();
        let adapter = RequestAdapter::new(&schema);

        let mut name_op = IndexMap::new();
        name_op.insert("_eq".to_string(), Value::from("ada"));
        let mut where_obj = IndexMap::new();
        where_obj.insert("name".to_string(), Value::Map(name_op));

        let mut arguments = IndexMap::new();
        arguments.insert("where".to_string(), Value::Map(where_obj));
        arguments.insert("_primaryKey".to_string(), Value::Int(7));

        let field = QueryField {
            name: "Users".to_string(),
            alias: None,
            arguments,
            selections: vec![],
        };

        let query = adapter.lower(&field, QueryType::Single).unwrap();
        match query.filter {
            Filter::And(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[0], Filter::Column { .. }));
                assert!(matches!(items[1], Filter::Column { .. }));
            }
            other => panic!("expected merged And, got {other:?}"),
        }
    }

    #[test]
    fn alias_propagates_to_the_lowered_query() {
        let schema = sample_schema();
        let adapter = RequestAdapter::new(&schema);
        let field = QueryField {
            name: "Users".to_string(),
            alias: Some("people".to_string()),
            arguments: IndexMap::new(),
            selections: vec![],
        };
        let query = adapter.lower(&field, QueryType::Standard).unwrap();
        assert_eq!(query.alias.as_deref(), Some("people"));
    }

    #[test]
    fn fragment_spread_expands_into_selections() {
        let schema = sample_schema();
        let adapter = RequestAdapter::new(&schema);

        let mut fragments = Fragments::new();
        fragments.insert(
            "UserFields".to_string(),
            vec![QueryField {
                name: "name".to_string(),
                ..Default::default()
            }],
        );

        let field = QueryField {
            name: "Users".to_string(),
            alias: None,
            arguments: IndexMap::new(),
            selections: vec![QueryField {
                name: "...UserFields".to_string(),
                ..Default::default()
            }],
        };

        let query = adapter.lower_with_fragments(&field, QueryType::Standard, &fragments).unwrap();
        assert_eq!(query.scalar_columns, vec!["name".to_string()]);
    }

    #[test]
    fn cyclic_fragment_spread_is_invalid_argument() {
        let schema = sample_schema();
        let adapter = RequestAdapter::new(&schema);

        let mut fragments = Fragments::new();
        fragments.insert(
            "A".to_string(),
            vec![QueryField {
                name: "...B".to_string(),
                ..Default::default()
            }],
        );
        fragments.insert(
            "B".to_string(),
            vec![QueryField {
                name: "...A".to_string(),
                ..Default::default()
            }],
        );

        let field = QueryField {
            name: "Users".to_string(),
            alias: None,
            arguments: IndexMap::new(),
            selections: vec![QueryField {
                name: "...A".to_string(),
                ..Default::default()
            }],
        };

        let err = adapter.lower_with_fragments(&field, QueryType::Standard, &fragments).unwrap_err();
        assert!(matches!(err, CompileError::InvalidArgument { .. }));
    }

    #[test]
    fn dynamic_join_connects_via_explicit_column_pair() {
        let schema = sample_schema();
        let adapter = RequestAdapter::new(&schema);

        let mut join_args = IndexMap::new();
        join_args.insert("table".to_string(), Value::from("Orders"));
        join_args.insert("fromColumn".to_string(), Value::from("Id"));
        join_args.insert("connectedColumn".to_string(), Value::from("UserId"));

        let field = QueryField {
            name: "Users".to_string(),
            alias: None,
            arguments: IndexMap::new(),
            selections: vec![QueryField {
                name: "_join_recentOrders".to_string(),
                alias: Some("recentOrders".to_string()),
                arguments: join_args,
                selections: vec![],
            }],
        };

        let query = adapter.lower(&field, QueryType::Standard).unwrap();
        let (name, nested) = query.links().next().expect("dynamic join connected");
        assert_eq!(name, "recentOrders");
        assert_eq!(nested.table, "Orders");
    }

    #[test]
    fn intent_round_trips_through_from_intent() {
        let schema = sample_schema();
        let adapter = RequestAdapter::new(&schema);

        let field = QueryField {
            name: "Users".to_string(),
            alias: None,
            arguments: IndexMap::new(),
            selections: vec![QueryField {
                name: "name".to_string(),
                ..Default::default()
            }],
        };

        let intent = adapter.to_intent(&field, RequestType::Query, QueryType::Standard).unwrap();
        let rebuilt = adapter.from_intent(&intent).unwrap();
        assert_eq!(rebuilt.scalar_columns, vec!["name".to_string()]);
    }

    #[test]
    fn intent_round_trips_a_single_link_join() {
        let schema = sample_schema();
        let adapter = RequestAdapter::new(&schema);

        let field = QueryField {
            name: "Orders".to_string(),
            alias: None,
            arguments: IndexMap::new(),
            selections: vec![QueryField {
                name: "user".to_string(),
                selections: vec![QueryField {
                    name: "name".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };

        let intent = adapter.to_intent(&field, RequestType::Query, QueryType::Standard).unwrap();
        assert_eq!(intent.joins.len(), 1);
        assert_eq!(intent.joins[0].relation.as_deref(), Some("user"));
        assert_eq!(intent.joins[0].table.as_deref(), Some("Users"));

        let rebuilt = adapter.from_intent(&intent).unwrap();
        let (relation, nested) = rebuilt.links().next().expect("single link connected");
        assert_eq!(relation, "user");
        assert_eq!(nested.table, "Users");
    }

    #[test]
    fn unknown_table_errors_on_lower() {
        let schema = sample_schema();
        let adapter = RequestAdapter::new(&schema);
        let field = QueryField {
            name: "Bogus".to_string(),
            ..Default::default()
        };
        let err = adapter.lower(&field, QueryType::Standard).unwrap_err();
        assert!(matches!(err, CompileError::SchemaLookup { .. }));
    }
}
