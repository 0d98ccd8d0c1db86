//! PostgreSQL connector implementation.
//!
//! Provides the `PostgresConnector` struct that implements the `Connector`
//! trait for PostgreSQL servers using sqlx.

use super::{
    error_row, BackendKind, Column, ConnectionParams, Connector, ExecutionOutcome, ObjectKind,
    Row, Schema, Table, Value,
};
use crate::error::{Result, TrellisError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo, ValueRef};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL database connector.
#[derive(Debug)]
pub struct PostgresConnector {
    pool: PgPool,
    host: String,
    port: u16,
    user: String,
    database: String,
}

impl PostgresConnector {
    /// Creates a connector from validated parameters.
    ///
    /// No connection is opened until the first call.
    pub fn new(params: &ConnectionParams) -> Result<Self> {
        params.validate(BackendKind::Postgres)?;

        let host = params.host.clone().unwrap_or_default();
        let port = params.port.or(BackendKind::Postgres.default_port()).unwrap_or(5432);
        let user = params.user.clone().unwrap_or_default();
        let database = params.database.clone().unwrap_or_default();

        let options = PgConnectOptions::new()
            .host(&host)
            .port(port)
            .username(&user)
            .password(params.password.as_deref().unwrap_or_default())
            .database(&database);

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_lazy_with(options);

        Ok(Self {
            pool,
            host,
            port,
            user,
            database,
        })
    }

    /// Creates a connector from an existing connection pool.
    ///
    /// This is primarily useful for testing.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            host: "localhost".to_string(),
            port: 5432,
            user: "unknown".to_string(),
            database: "unknown".to_string(),
        }
    }

    async fn list_objects(&self, schema: &str, table_type: &str) -> Result<Vec<Table>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1 AND table_type = $2
            ORDER BY table_name
            "#,
        )
        .bind(schema)
        .bind(table_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TrellisError::backend(format!("Failed to list objects in {schema}: {e}")))?;

        debug!("Listed {} {} object(s) in {}", names.len(), table_type, schema);
        Ok(names.into_iter().map(Table::new).collect())
    }

    async fn fetch_all(&self, sql: &str) -> std::result::Result<Vec<PgRow>, sqlx::Error> {
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

    fn map_connection_error(&self, error: sqlx::Error) -> TrellisError {
        let error_str = error.to_string().to_lowercase();
        let (host, port) = (&self.host, self.port);

        if error_str.contains("connection refused") || error_str.contains("could not connect") {
            TrellisError::connection(format!(
                "Cannot connect to {host}:{port}. Check that the server is running."
            ))
        } else if error_str.contains("password authentication failed")
            || error_str.contains("authentication failed")
        {
            TrellisError::connection(format!(
                "Authentication failed for user '{}'. Check your credentials.",
                self.user
            ))
        } else if error_str.contains("does not exist") && error_str.contains("database") {
            TrellisError::connection(format!("Database '{}' does not exist.", self.database))
        } else if error_str.contains("timed out") || error_str.contains("timeout") {
            TrellisError::connection(format!(
                "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
            ))
        } else {
            TrellisError::connection(error.to_string())
        }
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn connection_identity(&self) -> String {
        format!(
            "postgresql://{}:***@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }

    async fn test_connection(&self) -> Result<()> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| self.map_connection_error(e))?;
        drop(conn);
        debug!("Connected to {}", self.connection_identity());
        Ok(())
    }

    async fn list_schemas(&self) -> Result<Vec<Schema>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT schema_name::text
            FROM information_schema.schemata
            WHERE schema_name NOT IN ('pg_catalog', 'information_schema')
                AND schema_name NOT LIKE 'pg_toast%'
                AND schema_name NOT LIKE 'pg_temp%'
            ORDER BY schema_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TrellisError::backend(format!("Failed to list schemas: {e}")))?;

        Ok(names.into_iter().map(Schema::new).collect())
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<Table>> {
        self.list_objects(schema, "BASE TABLE").await
    }

    async fn list_views(&self, schema: &str) -> Result<Vec<Table>> {
        self.list_objects(schema, "VIEW").await
    }

    async fn list_columns(
        &self,
        schema: &str,
        object: &str,
        _kind: ObjectKind,
    ) -> Result<Vec<Column>> {
        let rows: Vec<(String, String, String, bool, Option<String>)> = sqlx::query_as(
            r#"
            SELECT
                c.column_name::text,
                c.data_type::text,
                c.is_nullable::text,
                EXISTS (
                    SELECT 1
                    FROM information_schema.table_constraints tc
                    JOIN information_schema.key_column_usage kcu
                        ON tc.constraint_name = kcu.constraint_name
                        AND tc.table_schema = kcu.table_schema
                    WHERE tc.constraint_type = 'PRIMARY KEY'
                        AND tc.table_schema = c.table_schema
                        AND tc.table_name = c.table_name
                        AND kcu.column_name = c.column_name
                ) AS is_primary,
                c.column_default::text
            FROM information_schema.columns c
            WHERE c.table_schema = $1 AND c.table_name = $2
            ORDER BY c.ordinal_position
            "#,
        )
        .bind(schema)
        .bind(object)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            TrellisError::backend(format!("Failed to fetch columns for {schema}.{object}: {e}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type, is_nullable, primary_key, default_value)| Column {
                name,
                data_type,
                required: is_nullable == "NO",
                primary_key,
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
            Err(e) => ExecutionOutcome::failure(format_query_error(e)),
        }
    }

    async fn query_rows(&self, sql: &str) -> Vec<Row> {
        match self.fetch_all(sql).await {
            Ok(rows) => rows.iter().map(convert_row).collect(),
            Err(e) => vec![error_row(format_query_error(e))],
        }
    }

    async fn query_rows_with_names(&self, sql: &str) -> Vec<Row> {
        let rows = match self.fetch_all(sql).await {
            Ok(rows) => rows,
            Err(e) => return vec![error_row(format_query_error(e))],
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

/// Formats a query error with the server's detail and hint when present.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = db_error.message().to_string();
    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }
    result
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => decode::<bool>(row, index).map_or(Value::Null, Value::Bool),
        "INT2" | "SMALLINT" => {
            decode::<i16>(row, index).map_or(Value::Null, |v| Value::Int(v as i64))
        }
        "INT4" | "INT" | "INTEGER" => decode::<i32>(row, index).map_or(Value::Null, Value::from),
        "INT8" | "BIGINT" => decode::<i64>(row, index).map_or(Value::Null, Value::Int),
        "FLOAT4" | "REAL" => {
            decode::<f32>(row, index).map_or(Value::Null, |v| Value::Float(v as f64))
        }
        "FLOAT8" | "DOUBLE PRECISION" => {
            decode::<f64>(row, index).map_or(Value::Null, Value::Float)
        }
        "BYTEA" => decode::<Vec<u8>>(row, index).map_or(Value::Null, Value::Bytes),

        // Kept as text so no precision is lost.
        "NUMERIC" => as_text(decode::<Decimal>(row, index)),

        "DATE" => as_text(decode::<NaiveDate>(row, index)),
        "TIME" => as_text(decode::<NaiveTime>(row, index)),
        "TIMESTAMP" => as_text(decode::<NaiveDateTime>(row, index)),
        "TIMESTAMPTZ" => as_text(decode::<DateTime<Utc>>(row, index)),
        "INTERVAL" => decode::<PgInterval>(row, index)
            .map_or(Value::Null, |v| Value::String(format_interval(&v))),
        "UUID" => as_text(decode::<Uuid>(row, index)),
        "JSON" | "JSONB" => as_text(decode::<serde_json::Value>(row, index)),

        _ => match row.try_get::<Option<String>, _>(index) {
            Ok(value) => value.map_or(Value::Null, Value::String),
            Err(e) => {
                debug!("Cannot decode {type_name} column {index} as text: {e}");
                match row.try_get_raw(index) {
                    Ok(raw) if raw.is_null() => Value::Null,
                    _ => Value::String(format!("<{}>", type_name.to_lowercase())),
                }
            }
        },
    }
}

fn decode<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    match row.try_get::<Option<T>, _>(index) {
        Ok(value) => value,
        Err(e) => {
            debug!("Cannot decode column {index}: {e}");
            None
        }
    }
}

fn as_text<T: ToString>(value: Option<T>) -> Value {
    value.map_or(Value::Null, |v| Value::String(v.to_string()))
}

/// Renders an interval the way psql prints it, e.g. `1 year 2 mons 3 days 04:05:06`.
fn format_interval(interval: &PgInterval) -> String {
    let mut parts = Vec::new();

    let years = interval.months / 12;
    let months = interval.months % 12;
    if years != 0 {
        parts.push(plural(years as i64, "year", "years"));
    }
    if months != 0 {
        parts.push(plural(months as i64, "mon", "mons"));
    }
    if interval.days != 0 {
        parts.push(plural(interval.days as i64, "day", "days"));
    }

    let micros = interval.microseconds;
    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let total = micros.unsigned_abs();
        let seconds = total / 1_000_000;
        let fraction = total % 1_000_000;
        let mut clock = format!(
            "{sign}{:02}:{:02}:{:02}",
            seconds / 3600,
            (seconds / 60) % 60,
            seconds % 60
        );
        if fraction != 0 {
            let digits = format!("{fraction:06}");
            clock.push('.');
            clock.push_str(digits.trim_end_matches('0'));
        }
        parts.push(clock);
    }

    parts.join(" ")
}

fn plural(n: i64, one: &str, many: &str) -> String {
    format!("{n} {}", if n == 1 { one } else { many })
}
