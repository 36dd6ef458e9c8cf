//! Integration tests exercising the literal scenarios from the
//! compiler's testable-properties list: simple/AND/IN filters across
//! three dialects, SQL Server's default pagination clause, and a
//! dialect-identity sanity check.

use bifrostql_compiler::{
    dialect_for, DialectKind, Filter, ForeignKeyCatalog, ParameterCollection, RawColumn, RawTable,
    SchemaModel, Value,
};
use indexmap::IndexMap;

fn users_schema() -> SchemaModel {
    SchemaModel::from_foreign_key_catalog(ForeignKeyCatalog {
        tables: vec![RawTable {
            db_name: "Users".into(),
            graphql_name: "Users".into(),
            schema: None,
            columns: vec![
                RawColumn {
                    db_name: "Id".into(),
                    graphql_name: "Id".into(),
                    data_type: "int".into(),
                    is_primary_key: true,
                    is_nullable: false,
                },
                RawColumn {
                    db_name: "Name".into(),
                    graphql_name: "Name".into(),
                    data_type: "text".into(),
                    is_primary_key: false,
                    is_nullable: true,
                },
                RawColumn {
                    db_name: "Email".into(),
                    graphql_name: "Email".into(),
                    data_type: "text".into(),
                    is_primary_key: false,
                    is_nullable: true,
                },
            ],
        }],
        foreign_keys: vec![],
    })
    .unwrap()
}

fn op_filter(column: &str, op: &str, value: Value) -> IndexMap<String, Value> {
    let mut operator = IndexMap::new();
    operator.insert(op.to_string(), value);
    let mut obj = IndexMap::new();
    obj.insert(column.to_string(), Value::Map(operator));
    obj
}

#[test]
fn scenario_1_simple_eq_filter_sql_server() {
    let schema = users_schema();
    let table = schema.table_by_graphql_name("Users").unwrap();
    let dialect = dialect_for(DialectKind::SqlServer);
    let params = ParameterCollection::new("@");

    let obj = op_filter("Id", "_eq", Value::Int(42));
    let filter = Filter::from_object(table, &schema, &obj).unwrap();
    let sql = filter.to_sql(table, &schema, dialect, &params).unwrap();

    assert_eq!(sql.sql, "[Users].[Id] = @p0");
    assert_eq!(sql.parameters.len(), 1);
    assert_eq!(sql.parameters[0].name, "@p0");
    assert_eq!(sql.parameters[0].value, Value::Int(42));
}

#[test]
fn scenario_2_and_filter_mysql() {
    let schema = users_schema();
    let table = schema.table_by_graphql_name("Users").unwrap();
    let dialect = dialect_for(DialectKind::MySql);
    let params = ParameterCollection::new("@");

    let mut obj = IndexMap::new();
    obj.insert(
        "and".to_string(),
        Value::List(vec![
            Value::Map(op_filter("Name", "_eq", Value::from("John"))),
            Value::Map(op_filter("Email", "_contains", Value::from("@test.com"))),
        ]),
    );
    let filter = Filter::from_object(table, &schema, &obj).unwrap();
    let sql = filter.to_sql(table, &schema, dialect, &params).unwrap();

    assert_eq!(
        sql.sql,
        "((`Users`.`Name` = @p0) AND (`Users`.`Email` LIKE CONCAT('%', @p1, '%')))"
    );
    assert_eq!(sql.parameters.len(), 2);
}

#[test]
fn scenario_3_in_filter_postgres() {
    let schema = users_schema();
    let table = schema.table_by_graphql_name("Users").unwrap();
    let dialect = dialect_for(DialectKind::Postgres);
    let params = ParameterCollection::new("@");

    let obj = op_filter(
        "Id",
        "_in",
        Value::List(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
            Value::Int(4),
            Value::Int(5),
        ]),
    );
    let filter = Filter::from_object(table, &schema, &obj).unwrap();
    let sql = filter.to_sql(table, &schema, dialect, &params).unwrap();

    assert_eq!(sql.sql, "\"Users\".\"Id\" IN (@p0, @p1, @p2, @p3, @p4)");
    assert_eq!(sql.parameters.len(), 5);
    for (i, param) in sql.parameters.iter().enumerate() {
        assert_eq!(param.value, Value::Int(i as i64 + 1));
    }
}

#[test]
fn scenario_4_sqlserver_default_pagination() {
    let dialect = dialect_for(DialectKind::SqlServer);
    let clause = dialect.pagination(&[], None, None);
    assert_eq!(
        clause,
        " ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 100 ROWS ONLY"
    );
}

#[test]
fn dialect_identity_property() {
    let kinds = [
        DialectKind::SqlServer,
        DialectKind::Postgres,
        DialectKind::MySql,
        DialectKind::Sqlite,
    ];
    let identities: Vec<&str> = kinds.iter().map(|k| dialect_for(*k).last_inserted_identity()).collect();
    for identity in &identities {
        assert!(!identity.is_empty());
        assert!(identity.contains('(') && identity.contains(')'));
    }
    let unique: std::collections::HashSet<&str> = identities.iter().copied().collect();
    assert_eq!(unique.len(), 4, "all four dialects must disagree");
}

#[test]
fn parameter_uniqueness_across_main_and_count_statements() {
    use bifrostql_compiler::{ObjectQuery, QueryType};

    let schema = users_schema();
    let dialect = dialect_for(DialectKind::Postgres);
    let params = ParameterCollection::new("@");

    let mut query = ObjectQuery::new("Users", QueryType::Standard);
    query.include_result = true;
    let obj = op_filter("Name", "_eq", Value::from("ada"));
    query.filter = Filter::from_object(schema.table_by_db_name("Users").unwrap(), &schema, &obj).unwrap();

    let statements = query.compile(&schema, dialect, &params).unwrap();
    assert_eq!(statements.len(), 2);

    let main = &statements["Users"];
    let count = &statements["Users=>count"];
    let main_param = &main.parameters[0].name;
    let count_param = &count.parameters[0].name;
    assert_ne!(main_param, count_param);
    assert_eq!(main_param, "@p0");
    assert_eq!(count_param, "@p1");
}

#[test]
fn scenario_6_multi_link_join_sql_server() {
    use bifrostql_compiler::{ObjectQuery, QueryType};

    let schema = SchemaModel::from_foreign_key_catalog(ForeignKeyCatalog {
        tables: vec![
            RawTable {
                db_name: "Users".into(),
                graphql_name: "Users".into(),
                schema: None,
                columns: vec![RawColumn {
                    db_name: "Id".into(),
                    graphql_name: "Id".into(),
                    data_type: "int".into(),
                    is_primary_key: true,
                    is_nullable: false,
                }],
            },
            RawTable {
                db_name: "Orders".into(),
                graphql_name: "Orders".into(),
                schema: None,
                columns: vec![
                    RawColumn {
                        db_name: "Id".into(),
                        graphql_name: "Id".into(),
                        data_type: "int".into(),
                        is_primary_key: true,
                        is_nullable: false,
                    },
                    RawColumn {
                        db_name: "UserId".into(),
                        graphql_name: "UserId".into(),
                        data_type: "int".into(),
                        is_primary_key: false,
                        is_nullable: false,
                    },
                    RawColumn {
                        db_name: "Total".into(),
                        graphql_name: "Total".into(),
                        data_type: "real".into(),
                        is_primary_key: false,
                        is_nullable: false,
                    },
                ],
            },
        ],
        foreign_keys: vec![bifrostql_compiler::RawForeignKey {
            child_table: "Orders".into(),
            child_column: "UserId".into(),
            parent_table: "Users".into(),
            parent_column: "Id".into(),
        }],
    })
    .unwrap();

    let dialect = dialect_for(DialectKind::SqlServer);
    let params = ParameterCollection::new("@");

    let mut root = ObjectQuery::new("Users", QueryType::Standard);
    let mut orders = ObjectQuery::new("Orders", QueryType::Standard);
    orders.scalar_columns = vec!["Id".to_string(), "Total".to_string()];
    root.connect_links(&schema, "Orders", None, orders).unwrap();

    let statements = root.compile(&schema, dialect, &params).unwrap();
    let joined = &statements["Users->Orders"];

    assert!(joined.sql.contains("SELECT DISTINCT [Users].[Id] AS joinid"));
    assert!(joined.sql.contains("INNER JOIN [Orders]"));
    assert!(joined.sql.contains("[Orders_pin].joinid = [Orders].[UserId]"));
    assert!(joined.sql.contains("[Orders_pin].joinid AS src_id"));
}
