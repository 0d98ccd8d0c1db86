//! Statement dispatch and result shaping.
//!
//! [`QueryDispatcher`] classifies a statement, runs it through the right
//! connector call and shapes whatever comes back into a [`ResultSet`] for
//! tabular display. Backend failures arrive in-band and are shaped like
//! any other result.

use super::classify::{classify, Classification};
use super::format::format_sql;
use crate::config::QueryConfig;
use crate::db::{sentinel_message, Connector, Row, Value};
use tracing::{debug, info};

/// Header of the two-column status table.
pub const STATUS_COLUMNS: [&str; 2] = ["Status", "msg"];

/// A displayable result: column names plus data rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    /// Creates a result set from a header and data rows.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// A two-column `("Status", "msg")` table.
    pub fn status_table(rows: Vec<(String, Option<String>)>) -> Self {
        Self {
            columns: STATUS_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|(status, msg)| vec![Value::String(status), Value::from(msg)])
                .collect(),
        }
    }

    /// Returns true if this is a status table rather than query output.
    pub fn is_status_table(&self) -> bool {
        self.columns == STATUS_COLUMNS
    }

    /// The header as a row followed by the data rows.
    pub fn to_rows_with_header(&self) -> Vec<Row> {
        let header: Row = self.columns.iter().map(|c| Value::from(c.as_str())).collect();
        std::iter::once(header).chain(self.rows.iter().cloned()).collect()
    }
}

fn status(status: &str, message: &str) -> (String, Option<String>) {
    (status.to_string(), Some(message.to_string()))
}

/// Classifies statements and shapes their results.
#[derive(Debug, Clone, Default)]
pub struct QueryDispatcher {
    config: QueryConfig,
}

impl QueryDispatcher {
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    /// Formats `sql` with the configured indent.
    pub fn format(&self, sql: &str) -> String {
        format_sql(sql, self.config.indent)
    }

    /// Runs `sql` against `connector` and shapes the outcome.
    ///
    /// Returns `None` when there is nothing to render: empty input, or a
    /// query that produced no rows at all. The caller is expected to clear
    /// any previously displayed result before calling this.
    pub async fn dispatch(&self, sql: &str, connector: &dyn Connector) -> Option<ResultSet> {
        let classification = classify(sql);
        debug!("Dispatching statement classified as {:?}", classification);

        match classification {
            Classification::Empty => None,
            Classification::Mutation(kind) => {
                let outcome = connector.execute(sql).await;
                info!("{} finished with status {}", kind, outcome.status);
                Some(ResultSet::status_table(vec![(
                    outcome.status.to_string(),
                    outcome.message,
                )]))
            }
            Classification::Query => shape_rows(connector.query_rows_with_names(sql).await),
            Classification::Unhandled(kind) => Some(ResultSet::status_table(vec![
                status("Error", "Unhandled query type"),
                status("QueryType", &kind),
            ])),
            Classification::Unknown => Some(ResultSet::status_table(vec![
                status("Error", "Unknown query type"),
                status("", "Raise a bug if the query is valid."),
            ])),
        }
    }

    /// Previews the first rows of a table or view.
    ///
    /// Returns the formatted preview statement (for the editor buffer)
    /// alongside its result.
    pub async fn preview(
        &self,
        connector: &dyn Connector,
        schema: &str,
        object: &str,
    ) -> (String, Option<ResultSet>) {
        let sql = self.format(&connector.preview_query(schema, object, self.config.preview_limit));
        let result = self.dispatch(&sql, connector).await;
        (sql, result)
    }
}

/// Shapes `query_rows_with_names` output into a result set.
fn shape_rows(rows: Vec<Row>) -> Option<ResultSet> {
    if let Some(message) = sentinel_message(&rows) {
        return Some(ResultSet::status_table(vec![(
            crate::db::ERROR_SENTINEL.to_string(),
            Some(message),
        )]));
    }

    let mut rows = rows.into_iter();
    let header = rows.next()?;
    let columns = header.iter().map(Value::to_display_string).collect();
    Some(ResultSet::new(columns, rows.collect()))
}
