//! SQLite integration tests.
//!
//! These run against a temporary database file and need no setup.

use db_trellis::connection::{Connection, ConnectionRegistry, Environment};
use db_trellis::db::{BackendKind, ConnectionParams, Connector, Value};
use db_trellis::error::TrellisError;
use db_trellis::navigation::NavigationTree;
use db_trellis::output::render_tree;
use db_trellis::query::QueryDispatcher;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

async fn open_sqlite(dir: &TempDir) -> Connection {
    let params = ConnectionParams {
        database: Some(dir.path().join("school.db").display().to_string()),
        ..Default::default()
    };
    Connection::open("school", Environment::Dev, BackendKind::Sqlite, params)
        .await
        .unwrap()
}

async fn run(dispatcher: &QueryDispatcher, connector: &dyn Connector, sql: &str) {
    let result = dispatcher.dispatch(sql, connector).await.unwrap();
    assert_eq!(result.rows[0][0], Value::from("Success"), "{sql}: {result:?}");
}

#[tokio::test]
async fn test_missing_database_is_configuration_error() {
    let result = Connection::open(
        "nowhere",
        Environment::Dev,
        BackendKind::Sqlite,
        ConnectionParams::default(),
    )
    .await;

    match result {
        Err(TrellisError::MissingFields { fields, .. }) => assert_eq!(fields, vec!["database"]),
        other => panic!("expected missing fields, got {other:?}"),
    }
}

#[tokio::test]
async fn test_statements_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let connection = open_sqlite(&dir).await;
    let dispatcher = QueryDispatcher::default();

    run(
        &dispatcher,
        connection.connector(),
        "CREATE TABLE students (id INTEGER PRIMARY KEY, name TEXT NOT NULL, gpa REAL)",
    )
    .await;
    run(
        &dispatcher,
        connection.connector(),
        "INSERT INTO students (name, gpa) VALUES ('Ada', 3.9), ('Linus', NULL)",
    )
    .await;

    let result = dispatcher
        .dispatch(
            "SELECT id, name, gpa FROM students ORDER BY id",
            connection.connector(),
        )
        .await
        .unwrap();
    assert_eq!(result.columns, vec!["id", "name", "gpa"]);
    assert_eq!(
        result.rows,
        vec![
            vec![Value::Int(1), Value::from("Ada"), Value::Float(3.9)],
            vec![Value::Int(2), Value::from("Linus"), Value::Null],
        ]
    );

    let empty = dispatcher
        .dispatch(
            "SELECT name FROM students WHERE id < 0",
            connection.connector(),
        )
        .await
        .unwrap();
    assert_eq!(empty.columns, vec!["name"]);
    assert!(empty.rows.is_empty());

    let (sql, preview) = dispatcher
        .preview(connection.connector(), "main", "students")
        .await;
    assert!(sql.contains("LIMIT"));
    assert_eq!(preview.unwrap().rows.len(), 2);
}

#[tokio::test]
async fn test_errors_are_rendered_as_data() {
    let dir = tempfile::tempdir().unwrap();
    let connection = open_sqlite(&dir).await;
    let dispatcher = QueryDispatcher::default();

    let failed = dispatcher
        .dispatch("DROP TABLE missing_table", connection.connector())
        .await
        .unwrap();
    assert_eq!(failed.rows[0][0], Value::from("Failure"));
    assert!(failed.rows[0][1].to_display_string().contains("missing_table"));

    let query_error = dispatcher
        .dispatch("SELECT * FROM missing_table", connection.connector())
        .await
        .unwrap();
    assert!(query_error.is_status_table());
    assert_eq!(query_error.rows[0][0], Value::from("error"));
}

#[tokio::test]
async fn test_tree_follows_schema_changes_after_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let connection = open_sqlite(&dir).await;
    let dispatcher = QueryDispatcher::default();
    run(
        &dispatcher,
        connection.connector(),
        "CREATE TABLE students (id INTEGER PRIMARY KEY, name TEXT NOT NULL DEFAULT 'anon')",
    )
    .await;
    run(
        &dispatcher,
        connection.connector(),
        "CREATE VIEW named AS SELECT name FROM students",
    )
    .await;

    let mut registry = ConnectionRegistry::new();
    registry.add(connection).unwrap();
    let mut tree = NavigationTree::from_registry(&registry);
    let conn = tree.connection_node("school").unwrap();
    tree.expand_to_depth(conn, 6, &mut registry).await.unwrap();

    let expected = "\
[s] main
  [T] Tables
    [t] students
      [c] id
        INTEGER
        PRIMARY KEY
      [c] name
        TEXT
        NOT NULL
        DEFAULT 'anon'
  [V] Views
    [v] named
      [c] name
        TEXT
  [SQ] Sequences";
    assert_eq!(render_tree(&tree, conn), expected);

    // New table is invisible until the table list is refreshed.
    let connector = registry.get("school").unwrap().connector();
    run(&dispatcher, connector, "CREATE TABLE courses (code TEXT)").await;

    let main = tree.child_named(conn, "main").unwrap();
    let tables = tree.child_named(main, "Tables").unwrap();
    let students = tree.child_named(tables, "students").unwrap();
    assert_eq!(tree.children(tables).len(), 1);

    assert_eq!(tree.refresh(students, &mut registry).unwrap(), tables);
    let children = tree.expand(tables, &mut registry).await.unwrap();
    let names: Vec<String> = children
        .iter()
        .map(|c| tree.node(*c).unwrap().name.clone())
        .collect();
    assert_eq!(names, vec!["courses", "students"]);

    // The view list was not invalidated.
    let views = tree.child_named(main, "Views").unwrap();
    assert_eq!(tree.children(views).len(), 1);
}
