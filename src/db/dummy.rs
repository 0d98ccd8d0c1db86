//! In-memory fixture backend.
//!
//! Serves a fixed sample hierarchy and a fixed result set without any I/O.
//! Used for offline/demo mode and whenever the backend kind is not
//! recognized.

use super::{BackendKind, Column, Connector, ExecutionOutcome, ObjectKind, Row, Schema, Table, Value};
use crate::error::Result;
use async_trait::async_trait;

/// (schema, [(object, kind, [(column, type, primary key)])])
type Fixture = &'static [(
    &'static str,
    &'static [(&'static str, ObjectKind, &'static [(&'static str, &'static str, bool)])],
)];

const FIXTURE: Fixture = &[
    (
        "public",
        &[
            (
                "users",
                ObjectKind::Table,
                &[("id", "long", true), ("name", "string", false)],
            ),
            (
                "something",
                ObjectKind::Table,
                &[("id", "long", true), ("test", "number", false)],
            ),
            (
                "active_users",
                ObjectKind::View,
                &[("id", "long", false), ("name", "string", false)],
            ),
        ],
    ),
    (
        "test",
        &[
            (
                "test",
                ObjectKind::Table,
                &[("id", "long", true), ("test_name", "string", false)],
            ),
            (
                "more_tests",
                ObjectKind::Table,
                &[("id", "long", true), ("test_count", "number", false)],
            ),
        ],
    ),
];

const RESULT_HEADER: [&str; 4] = ["lane", "swimmer", "country", "time"];

const RESULT_ROWS: [(i64, &str, &str, f64); 9] = [
    (4, "Joseph Schooling", "Singapore", 50.39),
    (2, "Michael Phelps", "United States", 51.14),
    (5, "Chad le Clos", "South Africa", 51.14),
    (6, "László Cseh", "Hungary", 51.14),
    (3, "Li Zhuhao", "China", 51.26),
    (8, "Mehdy Metella", "France", 51.58),
    (7, "Tom Shields", "United States", 51.73),
    (1, "Aleksandr Sadovnikov", "Russia", 51.84),
    (10, "Darren Burns", "Scotland", 51.84),
];

/// A connector that answers from the built-in fixture.
#[derive(Debug, Clone, Default)]
pub struct DummyConnector;

impl DummyConnector {
    pub fn new() -> Self {
        Self
    }

    fn objects(schema: &str, kind: ObjectKind) -> Vec<Table> {
        FIXTURE
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(schema))
            .flat_map(|(_, objects)| objects.iter())
            .filter(|(_, object_kind, _)| *object_kind == kind)
            .map(|(name, _, _)| Table::new(*name))
            .collect()
    }

    fn data_rows() -> Vec<Row> {
        RESULT_ROWS
            .iter()
            .map(|(lane, swimmer, country, time)| {
                vec![
                    Value::Int(*lane),
                    Value::from(*swimmer),
                    Value::from(*country),
                    Value::Float(*time),
                ]
            })
            .collect()
    }
}

#[async_trait]
impl Connector for DummyConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::Dummy
    }

    fn connection_identity(&self) -> String {
        "dummy://fixture".to_string()
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn list_schemas(&self) -> Result<Vec<Schema>> {
        Ok(FIXTURE.iter().map(|(name, _)| Schema::new(*name)).collect())
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<Table>> {
        Ok(Self::objects(schema, ObjectKind::Table))
    }

    async fn list_views(&self, schema: &str) -> Result<Vec<Table>> {
        Ok(Self::objects(schema, ObjectKind::View))
    }

    async fn list_columns(
        &self,
        schema: &str,
        object: &str,
        kind: ObjectKind,
    ) -> Result<Vec<Column>> {
        Ok(FIXTURE
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(schema))
            .flat_map(|(_, objects)| objects.iter())
            .filter(|(name, object_kind, _)| *object_kind == kind && name.eq_ignore_ascii_case(object))
            .flat_map(|(_, _, columns)| columns.iter())
            .map(|(name, data_type, pk)| {
                Column::new(*name, *data_type)
                    .required(*pk)
                    .primary_key(*pk)
            })
            .collect())
    }

    async fn execute(&self, _sql: &str) -> ExecutionOutcome {
        ExecutionOutcome::success()
    }

    async fn query_rows(&self, _sql: &str) -> Vec<Row> {
        Self::data_rows()
    }

    async fn query_rows_with_names(&self, _sql: &str) -> Vec<Row> {
        let header: Row = RESULT_HEADER.iter().map(|name| Value::from(*name)).collect();
        std::iter::once(header).chain(Self::data_rows()).collect()
    }
}
