//! Query dispatch integration tests against the fixture backends.

use db_trellis::config::QueryConfig;
use db_trellis::db::mock::{snapshot, RecordingConnector};
use db_trellis::db::{DummyConnector, ExecutionOutcome, Value};
use db_trellis::query::{QueryDispatcher, STATUS_COLUMNS};
use pretty_assertions::assert_eq;

fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

#[tokio::test]
async fn test_failed_mutation_renders_status_table() {
    let connector =
        RecordingConnector::new().with_execute_outcome(ExecutionOutcome::failure("syntax error"));
    let dispatcher = QueryDispatcher::default();

    let result = dispatcher
        .dispatch("UPDATE t SET x = 1", &connector)
        .await
        .unwrap();

    assert_eq!(
        result.to_rows_with_header(),
        vec![
            vec![text("Status"), text("msg")],
            vec![text("Failure"), text("syntax error")],
        ]
    );
}

#[tokio::test]
async fn test_classification_paths() {
    let connector = RecordingConnector::new();
    let log = connector.call_log();
    let dispatcher = QueryDispatcher::default();

    let query = dispatcher.dispatch("SELECT 1", &connector).await.unwrap();
    assert_eq!(query.columns, vec!["lane", "swimmer", "country", "time"]);

    let insert = dispatcher
        .dispatch("INSERT INTO t VALUES (1)", &connector)
        .await
        .unwrap();
    assert_eq!(insert.columns, STATUS_COLUMNS);
    assert_eq!(insert.rows, vec![vec![text("Success"), Value::Null]]);

    assert_eq!(dispatcher.dispatch("", &connector).await, None);

    let unknown = dispatcher
        .dispatch("FROBNICATE x", &connector)
        .await
        .unwrap();
    assert_eq!(unknown.rows[0], vec![text("Error"), text("Unknown query type")]);

    assert_eq!(
        snapshot(&log),
        vec![
            "query_rows_with_names:SELECT 1".to_string(),
            "execute:INSERT INTO t VALUES (1)".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_fixture_query_returns_swimmers() {
    let dispatcher = QueryDispatcher::default();
    let result = dispatcher
        .dispatch("select * from results", &DummyConnector::new())
        .await
        .unwrap();

    assert_eq!(result.rows.len(), 9);
    assert_eq!(result.rows[0][1], text("Joseph Schooling"));
    assert!(!result.is_status_table());
}

#[tokio::test]
async fn test_preview_uses_configured_limit_and_indent() {
    let dispatcher = QueryDispatcher::new(QueryConfig {
        preview_limit: 25,
        indent: 4,
    });
    let connector = RecordingConnector::new();
    let log = connector.call_log();

    let (sql, result) = dispatcher.preview(&connector, "public", "users").await;

    assert!(sql.contains("LIMIT"), "{sql}");
    assert!(sql.contains("25"), "{sql}");
    assert!(sql.lines().any(|line| line.starts_with("    ")), "{sql}");
    assert!(result.is_some());
    assert_eq!(snapshot(&log), vec![format!("query_rows_with_names:{sql}")]);
}

#[test]
fn test_format_is_idempotent() {
    let dispatcher = QueryDispatcher::default();
    for sql in [
        "select a, b from t where a = 1 and b in (select x from y)",
        "insert into t (a, b) select a, b from u where a between 1 and 2",
        "select case when x is null then 0 else x end from t join u using (id)",
        "with s as (select 1 as n) select n from s union all select 2 -- done",
    ] {
        let once = dispatcher.format(sql);
        assert_eq!(dispatcher.format(&once), once, "{sql}");
        let lead = once.split_whitespace().next().unwrap();
        assert!(["SELECT", "INSERT", "WITH"].contains(&lead), "{once}");
    }
}
