//! PostgreSQL integration tests.
//!
//! Skipped unless DATABASE_URL points at a server the tests may write to.

use db_trellis::cache::ObjectKind;
use db_trellis::connection::{Connection, ConnectionRegistry, Environment};
use db_trellis::db::{BackendKind, ConnectionParams, Value};
use db_trellis::error::TrellisError;
use db_trellis::navigation::NavigationTree;
use db_trellis::query::QueryDispatcher;

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

/// Opens a tested connection to the test database.
async fn get_test_connection() -> Option<Connection> {
    let url = get_test_database_url()?;
    let (backend, params) = ConnectionParams::from_url(&url).ok()?;
    Connection::open("pg", Environment::Dev, backend, params).await.ok()
}

#[tokio::test(flavor = "current_thread")]
async fn test_unreachable_server_blocks_connection() {
    let params = ConnectionParams {
        database: Some("testdb".to_string()),
        host: Some("127.0.0.1".to_string()),
        port: Some(1),
        user: Some("testuser".to_string()),
        password: Some("testpass".to_string()),
    };

    let result = Connection::open("down", Environment::Dev, BackendKind::Postgres, params).await;
    let err = result.unwrap_err();
    assert!(matches!(err, TrellisError::Connection(_)), "{err:?}");
    assert!(err.blocks_new_connection());
}

#[tokio::test]
async fn test_missing_fields_are_all_listed() {
    let params = ConnectionParams {
        database: Some("testdb".to_string()),
        ..Default::default()
    };

    let err = Connection::open("partial", Environment::Dev, BackendKind::Postgres, params)
        .await
        .unwrap_err();
    let message = err.to_string();
    for field in ["host", "port", "user", "password"] {
        assert!(message.contains(field), "{message}");
    }
}

#[tokio::test]
async fn test_create_browse_and_drop() {
    let Some(connection) = get_test_connection().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let dispatcher = QueryDispatcher::default();
    let connector = connection.connector();

    // Start from a clean slate in case an earlier run was interrupted.
    connector.execute("DROP SCHEMA IF EXISTS trellis_it CASCADE").await;

    for sql in [
        "CREATE SCHEMA trellis_it",
        "CREATE TABLE trellis_it.orders (id SERIAL PRIMARY KEY, total NUMERIC(10,2) NOT NULL DEFAULT 0)",
        "CREATE VIEW trellis_it.big_orders AS SELECT id FROM trellis_it.orders WHERE total > 100",
        "INSERT INTO trellis_it.orders (total) VALUES (50), (150)",
    ] {
        let result = dispatcher.dispatch(sql, connector).await.unwrap();
        assert_eq!(result.rows[0][0], Value::from("Success"), "{sql}: {result:?}");
    }

    let rows = dispatcher
        .dispatch(
            "SELECT id FROM trellis_it.big_orders ORDER BY id",
            connector,
        )
        .await
        .unwrap();
    assert_eq!(rows.columns, vec!["id"]);
    assert_eq!(rows.rows, vec![vec![Value::Int(2)]]);

    let mut registry = ConnectionRegistry::new();
    registry.add(connection).unwrap();
    let mut tree = NavigationTree::from_registry(&registry);
    let conn = tree.connection_node("pg").unwrap();
    tree.expand_to_depth(conn, 3, &mut registry).await.unwrap();

    let schema = tree.child_named(conn, "trellis_it").unwrap();
    let tables = tree.child_named(schema, "Tables").unwrap();
    let views = tree.child_named(schema, "Views").unwrap();
    assert!(tree.child_named(tables, "orders").is_some());
    assert!(tree.child_named(views, "big_orders").is_some());

    let cache = &mut registry.get_mut("pg").unwrap().cache;
    let columns = cache
        .columns("trellis_it", "orders", ObjectKind::Table)
        .await
        .unwrap();
    assert_eq!(columns.len(), 2);
    assert!(columns[0].primary_key);
    assert!(columns[1].required);
    assert!(columns[1].default_value.is_some());

    let connector = registry.get("pg").unwrap().connector();
    let dropped = dispatcher
        .dispatch("DROP SCHEMA trellis_it CASCADE", connector)
        .await
        .unwrap();
    assert_eq!(dropped.rows[0][0], Value::from("Success"));
}

#[tokio::test]
async fn test_query_error_is_rendered() {
    let Some(connection) = get_test_connection().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = QueryDispatcher::default()
        .dispatch("SELECT * FROM trellis_no_such_table", connection.connector())
        .await
        .unwrap();
    assert!(result.is_status_table());
    assert_eq!(result.rows[0][0], Value::from("error"));
}

#[tokio::test]
async fn test_numeric_time_and_uuid_columns_keep_their_values() {
    let Some(connection) = get_test_connection().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = QueryDispatcher::default()
        .dispatch(
            "SELECT 1.5::numeric AS amount, now() AS at, gen_random_uuid() AS id",
            connection.connector(),
        )
        .await
        .unwrap();
    assert_eq!(result.columns, vec!["amount", "at", "id"]);
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0][0], Value::from("1.5"));
    assert!(result.rows[0].iter().all(|v| !v.is_null()), "{result:?}");
}
