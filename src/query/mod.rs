//! Query classification, formatting and dispatch for Trellis.
//!
//! This module turns raw statement text into a displayable result,
//! independent of any rendering layer.

pub mod classify;
pub mod dispatcher;
pub mod format;

pub use classify::{classify, Classification, StatementKind};
pub use dispatcher::{QueryDispatcher, ResultSet, STATUS_COLUMNS};
pub use format::format_sql;
