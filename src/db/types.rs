//! Raw result types returned by connectors.
//!
//! Rows are positional sequences of [`Value`]s. Backend failures during
//! statement execution travel in-band: `query_rows*` return the single
//! sentinel row `("error", message)` and `execute` returns a
//! [`ExecutionStatus::Failure`] outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

/// First cell of the sentinel row that signals a backend failure.
pub const ERROR_SENTINEL: &str = "error";

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// Builds the sentinel row used to report a backend error as data.
pub fn error_row(message: impl Into<String>) -> Row {
    vec![
        Value::String(ERROR_SENTINEL.to_string()),
        Value::String(message.into()),
    ]
}

/// Returns the error message if `rows` is exactly one sentinel row.
pub fn sentinel_message(rows: &[Row]) -> Option<String> {
    match rows {
        [row] if row.len() == 2 && row[0] == Value::String(ERROR_SENTINEL.to_string()) => {
            Some(row[1].to_display_string())
        }
        _ => None,
    }
}

/// Outcome status of a mutating statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Success,
    Failure,
}

impl ExecutionStatus {
    /// Returns the status name shown in the status table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of `Connector::execute`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    /// Error text on failure; `None` on success.
    pub message: Option<String>,
}

impl ExecutionOutcome {
    /// A successful execution.
    pub fn success() -> Self {
        Self {
            status: ExecutionStatus::Success,
            message: None,
        }
    }

    /// A failed execution carrying the backend's message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failure,
            message: Some(message.into()),
        }
    }

    /// Returns true if the statement succeeded.
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Attempts to convert the value to a string representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
