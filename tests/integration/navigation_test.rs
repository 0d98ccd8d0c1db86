//! Navigation tree integration tests.

use db_trellis::connection::{Connection, ConnectionRegistry, Environment};
use db_trellis::db::mock::{count, CallLog, FailingConnector, RecordingConnector};
use db_trellis::db::{BackendKind, ConnectionParams};
use db_trellis::navigation::{NavigationTree, NodeKind};
use db_trellis::output::render_tree;
use pretty_assertions::assert_eq;

fn recording(id: &str, env: Environment) -> (Connection, CallLog) {
    let connector = RecordingConnector::new();
    let log = connector.call_log();
    let connection = Connection::with_connector(
        id,
        env,
        BackendKind::Dummy,
        ConnectionParams::default(),
        Box::new(connector),
    );
    (connection, log)
}

#[tokio::test]
async fn test_render_expanded_fixture_tree() {
    let (connection, _) = recording("local", Environment::Dev);
    let mut registry = ConnectionRegistry::new();
    registry.add(connection).unwrap();

    let mut tree = NavigationTree::from_registry(&registry);
    let node = tree.connection_node("local").unwrap();
    tree.expand_to_depth(node, 3, &mut registry).await.unwrap();

    let expected = "\
[s] public
  [T] Tables
    [t] users
    [t] something
  [V] Views
    [v] active_users
  [SQ] Sequences
[s] test
  [T] Tables
    [t] test
    [t] more_tests
  [V] Views
  [SQ] Sequences";
    assert_eq!(render_tree(&tree, node), expected);
}

#[tokio::test]
async fn test_refresh_is_scoped_to_one_connection() {
    let (dev, dev_log) = recording("dev", Environment::Dev);
    let (prod, prod_log) = recording("prod", Environment::Prod);
    let mut registry = ConnectionRegistry::new();
    registry.add(dev).unwrap();
    registry.add(prod).unwrap();

    let mut tree = NavigationTree::from_registry(&registry);
    let dev_node = tree.connection_node("dev").unwrap();
    let prod_node = tree.connection_node("prod").unwrap();
    assert_eq!(tree.node(prod_node).unwrap().label(), "[PROD] prod");

    tree.expand_to_depth(dev_node, 3, &mut registry).await.unwrap();
    tree.expand_to_depth(prod_node, 3, &mut registry).await.unwrap();

    let public = tree.child_named(prod_node, "public").unwrap();
    let tables = tree.child_named(public, "tables").unwrap();
    tree.refresh_connection(tables, &mut registry).unwrap();

    tree.expand_to_depth(dev_node, 3, &mut registry).await.unwrap();
    tree.expand_to_depth(prod_node, 3, &mut registry).await.unwrap();

    assert_eq!(count(&dev_log, "list_schemas"), 1);
    assert_eq!(count(&prod_log, "list_schemas"), 2);
    assert_eq!(count(&prod_log, "list_tables:public"), 2);
}

#[tokio::test]
async fn test_view_columns_and_details() {
    let (connection, log) = recording("local", Environment::Sit);
    let mut registry = ConnectionRegistry::new();
    registry.add(connection).unwrap();

    let mut tree = NavigationTree::from_registry(&registry);
    let conn = tree.connection_node("local").unwrap();
    tree.expand_to_depth(conn, 3, &mut registry).await.unwrap();

    let public = tree.child_named(conn, "public").unwrap();
    let views = tree.child_named(public, "Views").unwrap();
    let view = tree.child_named(views, "active_users").unwrap();

    let columns = tree.expand(view, &mut registry).await.unwrap();
    assert_eq!(columns.len(), 2);
    assert!(columns
        .iter()
        .all(|c| tree.node(*c).unwrap().kind == NodeKind::Column));
    assert_eq!(count(&log, "list_columns:public.active_users"), 1);

    // View columns in the fixture are nullable and not keys.
    let details = tree.expand(columns[1], &mut registry).await.unwrap();
    let labels: Vec<String> = details
        .iter()
        .map(|d| tree.node(*d).unwrap().label())
        .collect();
    assert_eq!(labels, vec!["string"]);

    // Refreshing a column only drops its view's columns.
    assert_eq!(tree.refresh(columns[0], &mut registry).unwrap(), view);
    tree.expand(view, &mut registry).await.unwrap();
    assert_eq!(count(&log, "list_columns:public.active_users"), 2);
    assert_eq!(count(&log, "list_views:public"), 1);
}

#[tokio::test]
async fn test_failed_expansion_can_be_retried() {
    let mut registry = ConnectionRegistry::new();
    registry
        .add(Connection::with_connector(
            "broken",
            Environment::Dev,
            BackendKind::Dummy,
            ConnectionParams::default(),
            Box::new(FailingConnector::new("network down")),
        ))
        .unwrap();

    let mut tree = NavigationTree::from_registry(&registry);
    let node = tree.connection_node("broken").unwrap();

    assert!(tree.expand(node, &mut registry).await.is_err());
    assert!(!tree.node(node).unwrap().populated);
    assert!(tree.children(node).is_empty());
    assert!(tree.expand(node, &mut registry).await.is_err());
}

#[tokio::test]
async fn test_unregistered_connection_is_an_error() {
    let (connection, _) = recording("gone", Environment::Dev);
    let mut registry = ConnectionRegistry::new();
    registry.add(connection).unwrap();

    let mut tree = NavigationTree::from_registry(&registry);
    let node = tree.connection_node("gone").unwrap();
    registry.remove("gone");

    assert!(tree.expand(node, &mut registry).await.is_err());
}
