//! Per-backend lexical/syntactic rules (`spec.md` §4.1, C1).
//!
//! Each dialect is a zero-sized, process-wide singleton — pure functions,
//! no state, trivially mockable in tests, the same shape the teacher
//! used for its per-backend `SqliteJournalMode`/`SqliteSynchronous`
//! conversions, generalized here to a `Dialect` trait object instead of
//! a closed `From` conversion because callers select a dialect at
//! runtime from a schema connection string.

use crate::filter::FilterOp;

/// A column/direction pair as produced by sort-token parsing
/// (`spec.md` §4.6, "Sort tokens are parsed as `column_asc`/`column_desc`").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortColumn {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// The shape of a `LIKE`-family comparison, distinguishing which side(s)
/// of the parameter need wildcard concatenation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikePattern {
    /// `_like`/`_nlike`: the caller's value already contains any wildcards.
    Exact,
    /// `_contains`/`_ncontains`: `%value%`.
    Contains,
    /// `_starts_with`: `value%`.
    StartsWith,
    /// `_ends_with`: `%value`.
    EndsWith,
}

/// Capability set polymorphic over the four supported backends.
/// Implementors are zero-sized singletons; see `dialect_for`.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Wrap `name` in this dialect's identifier delimiters.
    fn escape_identifier(&self, name: &str) -> String;

    /// Dotted, both parts escaped; omits the leading dot when `schema`
    /// is absent or blank.
    fn table_reference(&self, schema: Option<&str>, table: &str) -> String {
        let table = self.escape_identifier(table);
        match schema {
            Some(s) if !s.trim().is_empty() => {
                format!("{}.{}", self.escape_identifier(s), table)
            }
            _ => table,
        }
    }

    /// The trailing `ORDER BY ... OFFSET/LIMIT ...` clause. `limit = -1`
    /// omits the row cap entirely (`spec.md` §4.1).
    fn pagination(&self, sort: &[SortColumn], offset: Option<i64>, limit: Option<i64>) -> String;

    /// Uniform across all four backends (`spec.md` §4.1).
    fn parameter_prefix(&self) -> &'static str {
        "@"
    }

    fn last_inserted_identity(&self) -> &'static str;

    /// Dialect-specific string-concatenation idiom for `LIKE` patterns.
    /// `param_ref` is already a parameter reference (e.g. `@p0`).
    fn like_pattern(&self, param_ref: &str, kind: LikePattern) -> String;

    /// `_eq → =`, `_neq → !=`, … (`spec.md` §4.1). Unknown operators
    /// default to `=`.
    fn operator(&self, op: FilterOp) -> &'static str {
        default_operator_token(op)
    }
}

fn default_operator_token(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "=",
        FilterOp::Neq => "!=",
        FilterOp::Lt => "<",
        FilterOp::Lte => "<=",
        FilterOp::Gt => ">",
        FilterOp::Gte => ">=",
        FilterOp::Contains
        | FilterOp::StartsWith
        | FilterOp::EndsWith
        | FilterOp::Like => "LIKE",
        FilterOp::NContains | FilterOp::Nlike => "NOT LIKE",
        FilterOp::In => "IN",
        FilterOp::Nin => "NOT IN",
        FilterOp::Between => "BETWEEN",
        FilterOp::Nbetween => "NOT BETWEEN",
        // IsNull/IsNotNull are rendered without an infix operator by
        // Filter::to_sql; this token is never actually spliced in.
        FilterOp::IsNull => "IS NULL",
        FilterOp::IsNotNull => "IS NOT NULL",
    }
}

fn pagination_limit_offset(sort: &[SortColumn], offset: Option<i64>, limit: Option<i64>) -> String {
    let mut clause = String::new();

    if !sort.is_empty() {
        let cols = sort
            .iter()
            .map(|s| format!("{} {}", s.column, s.direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        clause.push_str(" ORDER BY ");
        clause.push_str(&cols);
    }

    if limit != Some(-1) {
        clause.push_str(&format!(" LIMIT {}", limit.unwrap_or(100)));
    }

    match offset {
        Some(0) | None => {}
        Some(n) => clause.push_str(&format!(" OFFSET {n}")),
    }

    clause
}

pub struct SqlServerDialect;
pub struct PostgresDialect;
pub struct MySqlDialect;
pub struct SqliteDialect;

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn escape_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn pagination(&self, sort: &[SortColumn], offset: Option<i64>, limit: Option<i64>) -> String {
        let order_by = if sort.is_empty() {
            " ORDER BY (SELECT NULL)".to_string()
        } else {
            let cols = sort
                .iter()
                .map(|s| format!("{} {}", s.column, s.direction.as_sql()))
                .collect::<Vec<_>>()
                .join(", ");
            format!(" ORDER BY {cols}")
        };

        let mut clause = order_by;
        clause.push_str(&format!(" OFFSET {} ROWS", offset.unwrap_or(0)));

        if limit != Some(-1) {
            clause.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit.unwrap_or(100)));
        }

        clause
    }

    fn last_inserted_identity(&self) -> &'static str {
        "SCOPE_IDENTITY()"
    }

    fn like_pattern(&self, param_ref: &str, kind: LikePattern) -> String {
        match kind {
            LikePattern::Exact => param_ref.to_string(),
            LikePattern::Contains => format!("'%' + {param_ref} + '%'"),
            LikePattern::StartsWith => format!("{param_ref} + '%'"),
            LikePattern::EndsWith => format!("'%' + {param_ref}"),
        }
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn escape_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn pagination(&self, sort: &[SortColumn], offset: Option<i64>, limit: Option<i64>) -> String {
        pagination_limit_offset(sort, offset, limit)
    }

    fn last_inserted_identity(&self) -> &'static str {
        "lastval()"
    }

    fn like_pattern(&self, param_ref: &str, kind: LikePattern) -> String {
        match kind {
            LikePattern::Exact => param_ref.to_string(),
            LikePattern::Contains => format!("'%' || {param_ref} || '%'"),
            LikePattern::StartsWith => format!("{param_ref} || '%'"),
            LikePattern::EndsWith => format!("'%' || {param_ref}"),
        }
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn escape_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn pagination(&self, sort: &[SortColumn], offset: Option<i64>, limit: Option<i64>) -> String {
        pagination_limit_offset(sort, offset, limit)
    }

    fn last_inserted_identity(&self) -> &'static str {
        "LAST_INSERT_ID()"
    }

    fn like_pattern(&self, param_ref: &str, kind: LikePattern) -> String {
        match kind {
            LikePattern::Exact => param_ref.to_string(),
            LikePattern::Contains => format!("CONCAT('%', {param_ref}, '%')"),
            LikePattern::StartsWith => format!("CONCAT({param_ref}, '%')"),
            LikePattern::EndsWith => format!("CONCAT('%', {param_ref})"),
        }
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn escape_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn pagination(&self, sort: &[SortColumn], offset: Option<i64>, limit: Option<i64>) -> String {
        pagination_limit_offset(sort, offset, limit)
    }

    fn last_inserted_identity(&self) -> &'static str {
        "last_insert_rowid()"
    }

    fn like_pattern(&self, param_ref: &str, kind: LikePattern) -> String {
        match kind {
            LikePattern::Exact => param_ref.to_string(),
            LikePattern::Contains => format!("'%' || {param_ref} || '%'"),
            LikePattern::StartsWith => format!("{param_ref} || '%'"),
            LikePattern::EndsWith => format!("'%' || {param_ref}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DialectKind {
    SqlServer,
    Postgres,
    MySql,
    Sqlite,
}

static SQL_SERVER: SqlServerDialect = SqlServerDialect;
static POSTGRES: PostgresDialect = PostgresDialect;
static MYSQL: MySqlDialect = MySqlDialect;
static SQLITE: SqliteDialect = SqliteDialect;

/// Look up the process-wide singleton for a dialect kind.
pub fn dialect_for(kind: DialectKind) -> &'static dyn Dialect {
    match kind {
        DialectKind::SqlServer => &SQL_SERVER,
        DialectKind::Postgres => &POSTGRES,
        DialectKind::MySql => &MYSQL,
        DialectKind::Sqlite => &SQLITE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlserver_default_pagination() {
        let clause = dialect_for(DialectKind::SqlServer).pagination(&[], None, None);
        assert_eq!(
            clause,
            " ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 100 ROWS ONLY"
        );
    }

    #[test]
    fn sqlserver_limit_negative_one_omits_fetch_next() {
        let clause = dialect_for(DialectKind::SqlServer).pagination(&[], Some(5), Some(-1));
        assert_eq!(clause, " ORDER BY (SELECT NULL) OFFSET 5 ROWS");
    }

    #[test]
    fn postgres_limit_precedes_offset() {
        let clause = dialect_for(DialectKind::Postgres).pagination(&[], Some(20), Some(10));
        assert_eq!(clause, " LIMIT 10 OFFSET 20");
    }

    #[test]
    fn postgres_omits_offset_when_zero() {
        let clause = dialect_for(DialectKind::Postgres).pagination(&[], Some(0), Some(10));
        assert_eq!(clause, " LIMIT 10");
    }

    #[test]
    fn identity_expressions_are_distinct_and_nonempty() {
        let exprs: Vec<&str> = [
            DialectKind::SqlServer,
            DialectKind::Postgres,
            DialectKind::MySql,
            DialectKind::Sqlite,
        ]
        .into_iter()
        .map(|k| dialect_for(k).last_inserted_identity())
        .collect();

        for e in &exprs {
            assert!(!e.is_empty());
            assert!(e.contains('(') && e.contains(')'));
        }

        let unique: std::collections::HashSet<&str> = exprs.iter().copied().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn mysql_like_concat_forms() {
        let d = dialect_for(DialectKind::MySql);
        assert_eq!(
            d.like_pattern("@p1", LikePattern::Contains),
            "CONCAT('%', @p1, '%')"
        );
        assert_eq!(d.like_pattern("@p1", LikePattern::StartsWith), "CONCAT(@p1, '%')");
        assert_eq!(d.like_pattern("@p1", LikePattern::EndsWith), "CONCAT('%', @p1)");
    }

    #[test]
    fn escape_identifiers_per_dialect() {
        assert_eq!(dialect_for(DialectKind::SqlServer).escape_identifier("Users"), "[Users]");
        assert_eq!(dialect_for(DialectKind::Postgres).escape_identifier("Users"), "\"Users\"");
        assert_eq!(dialect_for(DialectKind::MySql).escape_identifier("Users"), "`Users`");
        assert_eq!(dialect_for(DialectKind::Sqlite).escape_identifier("Users"), "\"Users\"");
    }
}
