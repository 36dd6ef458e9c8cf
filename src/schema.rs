//! The data model: tables, columns, and relations (`spec.md` §3, C4).
//!
//! `SchemaModel` is built once per database connection and reused
//! across requests; the compiler treats it as read-only. Cyclic
//! references (a child's FK pointing at a parent that lists the child
//! among its multi-links) are avoided the way `spec.md` §9 prescribes:
//! tables live as values in a name-keyed registry, and relations store
//! the *name* of the opposite table rather than an owned/shared handle.

use indexmap::IndexMap;

use crate::error::{CompileError, Result};
use crate::value::Value;

/// A physical column and its GraphQL-facing name.
#[derive(Debug, Clone)]
pub struct Column {
    pub db_name: String,
    pub graphql_name: String,
    pub normalized_name: String,
    pub data_type: String,
    pub is_primary_key: bool,
    pub is_nullable: bool,
    pub metadata: IndexMap<String, Value>,
}

impl Column {
    pub fn new(
        db_name: impl Into<String>,
        graphql_name: impl Into<String>,
        data_type: impl Into<String>,
        is_primary_key: bool,
        is_nullable: bool,
    ) -> Self {
        let db_name = db_name.into();
        let normalized_name = normalize_column_name(&db_name);
        Self {
            db_name,
            graphql_name: graphql_name.into(),
            normalized_name,
            data_type: data_type.into(),
            is_primary_key,
            is_nullable,
            metadata: IndexMap::new(),
        }
    }
}

/// `spec.md` §3: lowercase `id` → `"id"`; columns ending in `id` → the
/// singular form of the prefix; otherwise the name unchanged. Used by
/// relation auto-discovery to match a foreign-key column against the
/// table it references (e.g. `category_id` → `category`).
pub fn normalize_column_name(name: &str) -> String {
    let lower = name.to_lowercase();
    if lower == "id" {
        return "id".to_string();
    }
    if lower.ends_with("id") && name.len() > 2 {
        let prefix = &name[..name.len() - 2];
        let prefix = prefix.trim_end_matches(['_', '-']);
        if prefix.is_empty() {
            return name.to_string();
        }
        return pluralizer::pluralize(prefix, 1, false);
    }
    name.to_string()
}

/// Many-to-one from the child's perspective: the child table holds the
/// foreign key.
#[derive(Debug, Clone)]
pub struct SingleRelation {
    pub name: String,
    pub child_table: String,
    pub child_column: String,
    pub parent_table: String,
    pub parent_column: String,
}

/// One-to-many from the parent's perspective: the symmetric partner of
/// a `SingleRelation` on the same foreign key.
#[derive(Debug, Clone)]
pub struct MultiRelation {
    pub name: String,
    pub parent_table: String,
    pub parent_column: String,
    pub child_table: String,
    pub child_column: String,
}

/// A relation that traverses a junction table.
#[derive(Debug, Clone)]
pub struct ManyToManyRelation {
    pub name: String,
    pub source_table: String,
    pub source_column: String,
    pub junction_table: String,
    pub junction_source_column: String,
    pub junction_target_column: String,
    pub target_table: String,
    pub target_column: String,
}

/// A table, its columns, and the relations anchored on it.
#[derive(Debug, Clone)]
pub struct Table {
    pub db_name: String,
    pub graphql_name: String,
    pub schema: Option<String>,
    pub normalized_name: String,
    primary_key: Vec<String>,
    columns_by_db_name: IndexMap<String, Column>,
    graphql_to_db_column: IndexMap<String, String>,
    single_links: IndexMap<String, SingleRelation>,
    multi_links: IndexMap<String, MultiRelation>,
    many_to_many_links: IndexMap<String, ManyToManyRelation>,
    metadata: IndexMap<String, Value>,
}

impl Table {
    pub fn new(
        db_name: impl Into<String>,
        graphql_name: impl Into<String>,
        schema: Option<String>,
    ) -> Self {
        let db_name = db_name.into();
        let normalized_name = pluralizer::pluralize(&db_name, 1, false);
        Self {
            db_name,
            graphql_name: graphql_name.into(),
            schema,
            normalized_name,
            primary_key: Vec::new(),
            columns_by_db_name: IndexMap::new(),
            graphql_to_db_column: IndexMap::new(),
            single_links: IndexMap::new(),
            multi_links: IndexMap::new(),
            many_to_many_links: IndexMap::new(),
            metadata: IndexMap::new(),
        }
    }

    pub fn add_column(&mut self, column: Column) {
        if column.is_primary_key {
            self.primary_key.push(column.db_name.clone());
        }
        self.graphql_to_db_column
            .insert(column.graphql_name.clone(), column.db_name.clone());
        self.columns_by_db_name.insert(column.db_name.clone(), column);
    }

    pub fn add_single_link(&mut self, relation: SingleRelation) {
        self.single_links.insert(relation.name.clone(), relation);
    }

    pub fn add_multi_link(&mut self, relation: MultiRelation) {
        self.multi_links.insert(relation.name.clone(), relation);
    }

    pub fn add_many_to_many_link(&mut self, relation: ManyToManyRelation) {
        self.many_to_many_links
            .insert(relation.name.clone(), relation);
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn column_by_db_name(&self, name: &str) -> Option<&Column> {
        self.columns_by_db_name.get(name)
    }

    /// Resolves a GraphQL-facing field name to its physical column.
    /// `Filter::to_sql` uses this — never the raw argument name — so
    /// GraphQL identifiers may differ freely from DB identifiers.
    pub fn column_by_graphql_name(&self, name: &str) -> Option<&Column> {
        self.graphql_to_db_column
            .get(name)
            .and_then(|db_name| self.columns_by_db_name.get(db_name))
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns_by_db_name.values()
    }

    /// Primary-key columns in declaration order.
    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.primary_key
            .iter()
            .filter_map(|name| self.columns_by_db_name.get(name))
            .collect()
    }

    pub fn single_link(&self, name: &str) -> Option<&SingleRelation> {
        self.single_links.get(name)
    }

    pub fn multi_link(&self, name: &str) -> Option<&MultiRelation> {
        self.multi_links.get(name)
    }

    pub fn many_to_many_link(&self, name: &str) -> Option<&ManyToManyRelation> {
        self.many_to_many_links.get(name)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.metadata.get(key) {
            Some(Value::Bool(b)) => *b,
            _ => default,
        }
    }
}

/// Raw column data as produced by live-database introspection — out of
/// scope here (`spec.md` §1), but this is the shape the compiler
/// consumes to build a `SchemaModel`.
#[derive(Debug, Clone)]
pub struct RawColumn {
    pub db_name: String,
    pub graphql_name: String,
    pub data_type: String,
    pub is_primary_key: bool,
    pub is_nullable: bool,
}

#[derive(Debug, Clone)]
pub struct RawTable {
    pub db_name: String,
    pub graphql_name: String,
    pub schema: Option<String>,
    pub columns: Vec<RawColumn>,
}

#[derive(Debug, Clone)]
pub struct RawForeignKey {
    pub child_table: String,
    pub child_column: String,
    pub parent_table: String,
    pub parent_column: String,
}

#[derive(Debug, Clone, Default)]
pub struct ForeignKeyCatalog {
    pub tables: Vec<RawTable>,
    pub foreign_keys: Vec<RawForeignKey>,
}

/// Read-only index of tables, reused across requests. Construction is
/// the only mutation path; after `from_foreign_key_catalog` or
/// `from_declaration` returns, nothing inside can change.
#[derive(Debug, Clone)]
pub struct SchemaModel {
    tables: IndexMap<String, Table>,
    graphql_index: IndexMap<String, String>,
}

impl SchemaModel {
    /// Builds a schema from an explicit, already-assembled set of
    /// tables (links included) — the shape a schema-stitching caller
    /// hands in directly, without FK auto-detection.
    pub fn from_declaration(tables: Vec<Table>) -> Result<Self> {
        let mut index = IndexMap::new();
        let mut graphql_index = IndexMap::new();
        for table in tables {
            graphql_index.insert(table.graphql_name.to_lowercase(), table.db_name.clone());
            index.insert(table.db_name.clone(), table);
        }
        Ok(Self {
            tables: index,
            graphql_index,
        })
    }

    /// Builds a schema from a foreign-key catalog: a `SingleRelation`
    /// is created on the child table and a `MultiRelation` on the
    /// parent for every FK; many-to-many links are inferred when a
    /// junction table has exactly two FKs to two distinct tables
    /// (`spec.md` §4.4).
    pub fn from_foreign_key_catalog(catalog: ForeignKeyCatalog) -> Result<Self> {
        let mut tables: IndexMap<String, Table> = IndexMap::new();
        let mut graphql_index = IndexMap::new();

        for raw in catalog.tables {
            let mut table = Table::new(raw.db_name.clone(), raw.graphql_name.clone(), raw.schema);
            for col in raw.columns {
                table.add_column(Column::new(
                    col.db_name,
                    col.graphql_name,
                    col.data_type,
                    col.is_primary_key,
                    col.is_nullable,
                ));
            }
            graphql_index.insert(table.graphql_name.to_lowercase(), table.db_name.clone());
            tables.insert(table.db_name.clone(), table);
        }

        // Junction-table detection: group FKs by child table; a table
        // with exactly two FKs to two distinct parents is a junction.
        let mut fks_by_child: IndexMap<String, Vec<&RawForeignKey>> = IndexMap::new();
        for fk in &catalog.foreign_keys {
            fks_by_child
                .entry(fk.child_table.clone())
                .or_default()
                .push(fk);
        }

        let mut junction_tables: IndexMap<String, (RawForeignKey, RawForeignKey)> = IndexMap::new();
        for (child, fks) in &fks_by_child {
            if fks.len() == 2 && fks[0].parent_table != fks[1].parent_table {
                junction_tables.insert(child.clone(), ((*fks[0]).clone(), (*fks[1]).clone()));
            }
        }

        for fk in &catalog.foreign_keys {
            if junction_tables.contains_key(&fk.child_table) {
                continue;
            }

            let single_name = {
                let child = tables.get(&fk.child_table).ok_or_else(|| {
                    CompileError::schema_lookup(format!("unknown table '{}'", fk.child_table))
                })?;
                child
                    .column_by_db_name(&fk.child_column)
                    .map(|c| c.normalized_name.clone())
                    .unwrap_or_else(|| normalize_column_name(&fk.child_column))
            };

            let parent_graphql_name = tables
                .get(&fk.parent_table)
                .map(|t| t.graphql_name.clone())
                .unwrap_or_else(|| fk.parent_table.clone());
            let child_graphql_name = tables
                .get(&fk.child_table)
                .map(|t| t.graphql_name.clone())
                .unwrap_or_else(|| fk.child_table.clone());

            if let Some(child) = tables.get_mut(&fk.child_table) {
                child.add_single_link(SingleRelation {
                    name: single_name,
                    child_table: fk.child_table.clone(),
                    child_column: fk.child_column.clone(),
                    parent_table: fk.parent_table.clone(),
                    parent_column: fk.parent_column.clone(),
                });
            }

            let multi_name = pluralizer::pluralize(&child_graphql_name, 2, false);
            if let Some(parent) = tables.get_mut(&fk.parent_table) {
                parent.add_multi_link(MultiRelation {
                    name: multi_name,
                    parent_table: fk.parent_table.clone(),
                    parent_column: fk.parent_column.clone(),
                    child_table: fk.child_table.clone(),
                    child_column: fk.child_column.clone(),
                });
            }

            let _ = parent_graphql_name; // retained for symmetry/documentation of intent
        }

        for (junction_name, (fk_a, fk_b)) in &junction_tables {
            let target_for_a = tables
                .get(&fk_b.parent_table)
                .map(|t| t.graphql_name.clone())
                .unwrap_or_else(|| fk_b.parent_table.clone());
            let target_for_b = tables
                .get(&fk_a.parent_table)
                .map(|t| t.graphql_name.clone())
                .unwrap_or_else(|| fk_a.parent_table.clone());

            if let Some(table_a) = tables.get_mut(&fk_a.parent_table) {
                table_a.add_many_to_many_link(ManyToManyRelation {
                    name: pluralizer::pluralize(&target_for_a, 2, false),
                    source_table: fk_a.parent_table.clone(),
                    source_column: fk_a.parent_column.clone(),
                    junction_table: junction_name.clone(),
                    junction_source_column: fk_a.child_column.clone(),
                    junction_target_column: fk_b.child_column.clone(),
                    target_table: fk_b.parent_table.clone(),
                    target_column: fk_b.parent_column.clone(),
                });
            }

            if let Some(table_b) = tables.get_mut(&fk_b.parent_table) {
                table_b.add_many_to_many_link(ManyToManyRelation {
                    name: pluralizer::pluralize(&target_for_b, 2, false),
                    source_table: fk_b.parent_table.clone(),
                    source_column: fk_b.parent_column.clone(),
                    junction_table: junction_name.clone(),
                    junction_source_column: fk_b.child_column.clone(),
                    junction_target_column: fk_a.child_column.clone(),
                    target_table: fk_a.parent_table.clone(),
                    target_column: fk_a.parent_column.clone(),
                });
            }
        }

        Ok(Self {
            tables,
            graphql_index,
        })
    }

    pub fn table_by_db_name(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn table_by_graphql_name(&self, name: &str) -> Option<&Table> {
        self.graphql_index
            .get(&name.to_lowercase())
            .and_then(|db_name| self.tables.get(db_name))
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }
}
