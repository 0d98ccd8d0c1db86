//! Connection store integration tests.

use db_trellis::config::StorageConfig;
use db_trellis::connection::{Connection, ConnectionRegistry, Environment};
use db_trellis::db::{BackendKind, ConnectionParams};
use db_trellis::persistence::ConnectionStore;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn storage(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        connections_file: Some(dir.path().join("connections.json")),
        key_file: Some(dir.path().join(".env")),
    }
}

#[tokio::test]
async fn test_save_and_reload_registry() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConnectionStore::open(&storage(&dir)).unwrap();

    let mut registry = store.load_registry().unwrap();
    assert!(registry.is_empty());

    let sqlite = Connection::open(
        "local",
        Environment::Sat,
        BackendKind::Sqlite,
        ConnectionParams {
            database: Some(dir.path().join("app.db").display().to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let demo = Connection::open(
        "demo",
        Environment::Dev,
        BackendKind::Dummy,
        ConnectionParams::default(),
    )
    .await
    .unwrap();
    registry.add(sqlite).unwrap();
    registry.add(demo).unwrap();
    store.save_registry(&registry).unwrap();

    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert!(!raw.contains("app.db"));
    assert!(raw.contains("\"type\": \"SQLITE\""));

    // A second store picks up the generated key from the key file.
    let reopened = ConnectionStore::open(&storage(&dir)).unwrap();
    let loaded = reopened.load_registry().unwrap();
    assert_eq!(loaded.ids(), vec!["local", "demo"]);

    let local = loaded.get("local").unwrap();
    assert_eq!(local.env, Environment::Sat);
    assert_eq!(local.backend, BackendKind::Sqlite);
    assert!(local
        .connector()
        .connection_identity()
        .ends_with("app.db"));
}

#[tokio::test]
async fn test_remove_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConnectionStore::open(&storage(&dir)).unwrap();

    let mut registry = ConnectionRegistry::new();
    for id in ["a", "b"] {
        let connection = Connection::open(
            id,
            Environment::Dev,
            BackendKind::Dummy,
            ConnectionParams::default(),
        )
        .await
        .unwrap();
        registry.add(connection).unwrap();
    }
    store.save_registry(&registry).unwrap();

    registry.remove("a").unwrap();
    store.save_registry(&registry).unwrap();

    let saved = store.load().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, "b");
}

#[test]
fn test_other_key_cannot_read_saved_fields() {
    let dir = tempfile::tempdir().unwrap();
    let other = tempfile::tempdir().unwrap();

    let store = ConnectionStore::open(&storage(&dir)).unwrap();
    let mut registry = ConnectionRegistry::new();
    registry
        .add(Connection::with_connector(
            "remote",
            Environment::Prod,
            BackendKind::Dummy,
            ConnectionParams {
                host: Some("db.internal".to_string()),
                ..Default::default()
            },
            Box::new(db_trellis::db::DummyConnector::new()),
        ))
        .unwrap();
    store.save_registry(&registry).unwrap();

    // Same connection file, different key.
    let foreign = ConnectionStore::open(&StorageConfig {
        connections_file: Some(store.path().to_path_buf()),
        key_file: Some(other.path().join(".env")),
    })
    .unwrap();
    assert!(foreign.load().is_err());
}
