//! Metadata cache integration tests.
//!
//! Drive the cache through the public API with a recording connector and
//! check how often the backend is reached.

use db_trellis::cache::{ClearKind, MetadataCache, ObjectKind};
use db_trellis::db::mock::{count, snapshot, CallLog, FailingConnector, RecordingConnector};

fn recording_cache() -> (MetadataCache, CallLog) {
    let connector = RecordingConnector::new();
    let log = connector.call_log();
    (MetadataCache::new(Box::new(connector)), log)
}

fn names<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    items.into_iter().map(String::from).collect()
}

#[tokio::test]
async fn test_columns_on_fresh_cache_loads_each_level_once() {
    let (mut cache, log) = recording_cache();

    let columns = cache
        .columns("public", "users", ObjectKind::Table)
        .await
        .unwrap();
    assert_eq!(
        names(columns.iter().map(|c| c.name.as_str())),
        names(["id", "name"])
    );

    assert_eq!(
        snapshot(&log),
        names([
            "list_schemas",
            "list_tables:public",
            "list_columns:public.users"
        ])
    );
}

#[tokio::test]
async fn test_untouched_subtrees_survive_mixed_invalidations() {
    let (mut cache, log) = recording_cache();

    for schema in ["public", "test"] {
        cache.tables(schema).await.unwrap();
        cache.views(schema).await.unwrap();
    }
    cache.columns("public", "users", ObjectKind::Table).await.unwrap();
    cache.columns("public", "something", ObjectKind::Table).await.unwrap();
    cache
        .columns("public", "active_users", ObjectKind::View)
        .await
        .unwrap();
    cache.columns("test", "test", ObjectKind::Table).await.unwrap();
    let before = snapshot(&log).len();

    cache.clear_by_type(ClearKind::Table, "public", Some("users"));
    cache.clear_by_type(ClearKind::Views, "public", None);
    cache.clear_by_type(ClearKind::Schema, "test", None);

    // Untouched: the other table's columns and the schema list.
    cache.columns("public", "something", ObjectKind::Table).await.unwrap();
    cache.schemas().await.unwrap();
    assert_eq!(snapshot(&log).len(), before);

    // Invalidated: exactly one call per invalidated level.
    cache.columns("public", "users", ObjectKind::Table).await.unwrap();
    cache.views("public").await.unwrap();
    cache.tables("test").await.unwrap();
    assert_eq!(count(&log, "list_columns:public.users"), 2);
    assert_eq!(count(&log, "list_views:public"), 2);
    assert_eq!(count(&log, "list_tables:test"), 2);
    assert_eq!(count(&log, "list_tables:public"), 1);
    assert_eq!(count(&log, "list_schemas"), 1);
}

#[tokio::test]
async fn test_upper_case_names_share_entries() {
    let (mut cache, log) = recording_cache();

    cache.tables("PUBLIC").await.unwrap();
    cache.tables("public").await.unwrap();
    cache.columns("Public", "USERS", ObjectKind::Table).await.unwrap();
    cache.columns("public", "users", ObjectKind::Table).await.unwrap();

    assert_eq!(count(&log, "list_tables:public"), 1);
    assert_eq!(count(&log, "list_columns:public.users"), 1);
}

#[tokio::test]
async fn test_clear_schemas_refetches_everything() {
    let (mut cache, log) = recording_cache();
    cache.columns("public", "users", ObjectKind::Table).await.unwrap();

    cache.clear_by_type(ClearKind::Schemas, "", None);
    cache.columns("public", "users", ObjectKind::Table).await.unwrap();

    assert_eq!(count(&log, "list_schemas"), 2);
    assert_eq!(count(&log, "list_tables:public"), 2);
    assert_eq!(count(&log, "list_columns:public.users"), 2);
    assert!(cache.is_connected());
}

#[tokio::test]
async fn test_backend_failure_propagates_and_leaves_cache_empty() {
    let mut cache = MetadataCache::new(Box::new(FailingConnector::new("network down")));

    let err = cache.schemas().await.unwrap_err();
    assert!(err.to_string().contains("network down"));
    assert!(!cache.is_connected());
    assert!(cache.tables("public").await.is_err());
}
