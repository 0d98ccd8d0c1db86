//! SQLite connector implementation.
//!
//! Provides the `SqliteConnector` struct that implements the `Connector`
//! trait for embedded file databases using sqlx. Each attached database
//! (`main`, plus anything attached with `ATTACH`) is presented as a schema.

use super::{
    error_row, quote_ident, BackendKind, Column, ConnectionParams, Connector, ExecutionOutcome,
    ObjectKind, Row, Schema, Table, Value,
};
use crate::error::{Result, TrellisError};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo, ValueRef};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Database name that selects a private in-memory database.
const MEMORY_DATABASE: &str = ":memory:";

/// SQLite database connector.
#[derive(Debug)]
pub struct SqliteConnector {
    pool: SqlitePool,
    path: String,
}

impl SqliteConnector {
    /// Creates a connector for the database named in `params`.
    ///
    /// The file is opened (and created if missing) on first use, not here.
    pub fn new(params: &ConnectionParams) -> Result<Self> {
        let database = params
            .database
            .as_deref()
            .ok_or_else(|| TrellisError::missing_fields(BackendKind::Sqlite.display_name(), vec!["database"]))?;
        let path = resolve_path(database);

        let options = if path == MEMORY_DATABASE {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| TrellisError::config(format!("Invalid database path: {e}")))?
        } else {
            SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true)
        };

        // A single long-lived connection keeps in-memory databases alive and
        // matches the one-caller-per-connection model.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_lazy_with(options);

        Ok(Self { pool, path })
    }

    /// Creates a connector from an existing connection pool.
    ///
    /// This is primarily useful for testing.
    pub fn from_pool(pool: SqlitePool, path: impl Into<String>) -> Self {
        Self {
            pool,
            path: path.into(),
        }
    }

    async fn fetch_names(&self, sql: &str) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TrellisError::backend(e.to_string()))
    }

    async fn list_objects(&self, schema: &str, object_type: &str) -> Result<Vec<Table>> {
        let sql = format!(
            "SELECT name FROM {}.sqlite_master \
             WHERE type = '{object_type}' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
            quote_ident(schema)
        );
        let names = self.fetch_names(&sql).await?;
        debug!("Listed {} {}s in {}", names.len(), object_type, schema);
        Ok(names.into_iter().map(Table::new).collect())
    }

    async fn fetch_all(&self, sql: &str) -> std::result::Result<Vec<SqliteRow>, sqlx::Error> {
        sqlx::query(sql).fetch_all(&self.pool).await
    }

    /// Column names for a statement that returned no rows.
    async fn describe_columns(&self, sql: &str) -> Vec<String> {
        match (&self.pool).describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect(),
            Err(e) => {
                debug!("Could not describe statement: {e}");
                Vec::new()
            }
        }
    }
}

/// Maps a database name to the file that backs it.
///
/// A bare name without an extension gets `.db` appended.
fn resolve_path(database: &str) -> String {
    if database == MEMORY_DATABASE || Path::new(database).extension().is_some() {
        database.to_string()
    } else {
        format!("{database}.db")
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn connection_identity(&self) -> String {
        self.path.clone()
    }

    async fn test_connection(&self) -> Result<()> {
        let conn = self.pool.acquire().await.map_err(|e| {
            TrellisError::connection(format!("Cannot open SQLite database '{}': {e}", self.path))
        })?;
        drop(conn);
        debug!("SQLite database {} is reachable", self.path);
        Ok(())
    }

    async fn list_schemas(&self) -> Result<Vec<Schema>> {
        let rows = sqlx::query("PRAGMA database_list")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TrellisError::backend(e.to_string()))?;

        // The "temp" database only exists once something temporary is created.
        Ok(rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>("name").ok())
            .filter(|name| name != "temp")
            .map(Schema::new)
            .collect())
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<Table>> {
        self.list_objects(schema, "table").await
    }

    async fn list_views(&self, schema: &str) -> Result<Vec<Table>> {
        self.list_objects(schema, "view").await
    }

    async fn list_columns(
        &self,
        schema: &str,
        object: &str,
        _kind: ObjectKind,
    ) -> Result<Vec<Column>> {
        let rows: Vec<(String, String, i64, i64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT name, type, "notnull", pk, dflt_value
            FROM pragma_table_info(?1, ?2)
            ORDER BY cid
            "#,
        )
        .bind(object)
        .bind(schema)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            TrellisError::backend(format!("Failed to fetch columns for {schema}.{object}: {e}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type, not_null, pk, default_value)| Column {
                name,
                data_type,
                required: not_null != 0,
                primary_key: pk > 0,
                default_value,
            })
            .collect())
    }

    async fn execute(&self, sql: &str) -> ExecutionOutcome {
        match sqlx::raw_sql(sql).execute(&self.pool).await {
            Ok(done) => {
                debug!("Statement affected {} row(s)", done.rows_affected());
                ExecutionOutcome::success()
            }
            Err(e) => ExecutionOutcome::failure(e.to_string()),
        }
    }

    async fn query_rows(&self, sql: &str) -> Vec<Row> {
        match self.fetch_all(sql).await {
            Ok(rows) => rows.iter().map(convert_row).collect(),
            Err(e) => vec![error_row(e.to_string())],
        }
    }

    async fn query_rows_with_names(&self, sql: &str) -> Vec<Row> {
        let rows = match self.fetch_all(sql).await {
            Ok(rows) => rows,
            Err(e) => return vec![error_row(e.to_string())],
        };

        let names: Vec<String> = match rows.first() {
            Some(first) => first
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect(),
            None => self.describe_columns(sql).await,
        };

        let header: Row = names.into_iter().map(Value::String).collect();
        std::iter::once(header)
            .chain(rows.iter().map(convert_row))
            .collect()
    }
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Converts a single column value, using the value's runtime storage class.
///
/// Declared column types are unreliable for expressions, so the type of the
/// stored value decides how it is decoded.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match storage_class.as_str() {
        "INTEGER" | "INT8" | "BIGINT" | "BOOLEAN" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),
        "REAL" | "FLOAT" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
