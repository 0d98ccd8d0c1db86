//! Test doubles for the connector layer.
//!
//! [`RecordingConnector`] answers from the fixture and records every backend
//! call, so callers can assert how often (and in which order) the cache
//! reaches the backend. [`FailingConnector`] fails every call.

use super::{
    error_row, BackendKind, Column, Connector, DummyConnector, ExecutionOutcome, ObjectKind, Row,
    Schema, Table,
};
use crate::error::{Result, TrellisError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Shared log of backend calls.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// A fixture-backed connector that records each call it receives.
///
/// Calls are recorded as `list_schemas`, `list_tables:<schema>`,
/// `list_views:<schema>`, `list_columns:<schema>.<object>`,
/// `execute:<sql>`, `query_rows:<sql>` and `query_rows_with_names:<sql>`.
#[derive(Debug, Clone, Default)]
pub struct RecordingConnector {
    inner: DummyConnector,
    calls: CallLog,
    outcome: Option<ExecutionOutcome>,
    rows: Option<Vec<Row>>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `execute` return `outcome` instead of success.
    pub fn with_execute_outcome(mut self, outcome: ExecutionOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Makes both `query_rows*` methods return `rows` verbatim.
    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Handle to the call log; stays valid after the connector is boxed.
    pub fn call_log(&self) -> CallLog {
        Arc::clone(&self.calls)
    }

    /// Snapshot of the calls recorded so far.
    pub fn calls(&self) -> Vec<String> {
        snapshot(&self.calls)
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

/// Snapshot of a call log.
pub fn snapshot(log: &CallLog) -> Vec<String> {
    log.lock().map(|calls| calls.clone()).unwrap_or_default()
}

/// Number of recorded calls equal to `call`.
pub fn count(log: &CallLog, call: &str) -> usize {
    snapshot(log).iter().filter(|c| c.as_str() == call).count()
}

#[async_trait]
impl Connector for RecordingConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::Dummy
    }

    fn connection_identity(&self) -> String {
        "recording://fixture".to_string()
    }

    async fn test_connection(&self) -> Result<()> {
        self.record("test_connection".to_string());
        Ok(())
    }

    async fn list_schemas(&self) -> Result<Vec<Schema>> {
        self.record("list_schemas".to_string());
        self.inner.list_schemas().await
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<Table>> {
        self.record(format!("list_tables:{schema}"));
        self.inner.list_tables(schema).await
    }

    async fn list_views(&self, schema: &str) -> Result<Vec<Table>> {
        self.record(format!("list_views:{schema}"));
        self.inner.list_views(schema).await
    }

    async fn list_columns(
        &self,
        schema: &str,
        object: &str,
        kind: ObjectKind,
    ) -> Result<Vec<Column>> {
        self.record(format!("list_columns:{schema}.{object}"));
        self.inner.list_columns(schema, object, kind).await
    }

    async fn execute(&self, sql: &str) -> ExecutionOutcome {
        self.record(format!("execute:{sql}"));
        match &self.outcome {
            Some(outcome) => outcome.clone(),
            None => self.inner.execute(sql).await,
        }
    }

    async fn query_rows(&self, sql: &str) -> Vec<Row> {
        self.record(format!("query_rows:{sql}"));
        match &self.rows {
            Some(rows) => rows.clone(),
            None => self.inner.query_rows(sql).await,
        }
    }

    async fn query_rows_with_names(&self, sql: &str) -> Vec<Row> {
        self.record(format!("query_rows_with_names:{sql}"));
        match &self.rows {
            Some(rows) => rows.clone(),
            None => self.inner.query_rows_with_names(sql).await,
        }
    }
}

/// A connector whose backend is always unreachable.
#[derive(Debug, Clone)]
pub struct FailingConnector {
    message: String,
}

impl FailingConnector {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for FailingConnector {
    fn default() -> Self {
        Self::new("backend unavailable")
    }
}

#[async_trait]
impl Connector for FailingConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::Dummy
    }

    fn connection_identity(&self) -> String {
        "failing://nowhere".to_string()
    }

    async fn test_connection(&self) -> Result<()> {
        Err(TrellisError::connection(self.message.clone()))
    }

    async fn list_schemas(&self) -> Result<Vec<Schema>> {
        Err(TrellisError::backend(self.message.clone()))
    }

    async fn list_tables(&self, _schema: &str) -> Result<Vec<Table>> {
        Err(TrellisError::backend(self.message.clone()))
    }

    async fn list_views(&self, _schema: &str) -> Result<Vec<Table>> {
        Err(TrellisError::backend(self.message.clone()))
    }

    async fn list_columns(
        &self,
        _schema: &str,
        _object: &str,
        _kind: ObjectKind,
    ) -> Result<Vec<Column>> {
        Err(TrellisError::backend(self.message.clone()))
    }

    async fn execute(&self, _sql: &str) -> ExecutionOutcome {
        ExecutionOutcome::failure(self.message.clone())
    }

    async fn query_rows(&self, _sql: &str) -> Vec<Row> {
        vec![error_row(self.message.clone())]
    }

    async fn query_rows_with_names(&self, _sql: &str) -> Vec<Row> {
        vec![error_row(self.message.clone())]
    }
}
