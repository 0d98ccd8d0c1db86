//! Database metadata types for Trellis.
//!
//! Represents the browsable structure of a database: schemas holding
//! tables and views, which in turn hold columns. Child collections are
//! `Option`s so that "not yet loaded" (`None`) stays distinct from
//! "loaded and empty" (`Some` of an empty map).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered mapping from lower-cased name to metadata entry.
///
/// Insertion order follows the order the backend returned the entries in.
pub type NameMap<T> = IndexMap<String, T>;

/// Folds a name into the key used for case-insensitive lookups.
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// Builds a [`NameMap`] from entries, keyed by their lower-cased name.
pub fn keyed<T, F>(entries: impl IntoIterator<Item = T>, name: F) -> NameMap<T>
where
    F: Fn(&T) -> &str,
{
    entries
        .into_iter()
        .map(|entry| (name_key(name(&entry)), entry))
        .collect()
}

/// A named namespace grouping tables and views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema name as returned by the backend.
    pub name: String,

    /// Base tables, `None` until listed.
    pub tables: Option<NameMap<Table>>,

    /// Views, `None` until listed.
    pub views: Option<NameMap<Table>>,
}

impl Schema {
    /// Creates a schema stub with neither tables nor views loaded.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: None,
            views: None,
        }
    }

    /// Returns true once the table list has been populated.
    pub fn tables_loaded(&self) -> bool {
        self.tables.is_some()
    }

    /// Returns true once the view list has been populated.
    pub fn views_loaded(&self) -> bool {
        self.views.is_some()
    }
}

/// A table or view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name as returned by the backend.
    pub name: String,

    /// Columns, `None` until loaded. Population is all-or-nothing.
    pub columns: Option<NameMap<Column>>,
}

impl Table {
    /// Creates a table stub with no columns loaded.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: None,
        }
    }

    /// Creates a table with its full column list.
    pub fn with_columns(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns: Some(keyed(columns, |c| c.name.as_str())),
        }
    }

    /// Returns true once the columns have been populated.
    pub fn columns_loaded(&self) -> bool {
        self.columns.is_some()
    }

    /// Looks up a column by name, ignoring case.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.as_ref()?.get(&name_key(name))
    }
}

/// A column in a table or view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared data type (e.g., "integer", "varchar(255)").
    pub data_type: String,

    /// Whether the column is declared NOT NULL.
    pub required: bool,

    /// Whether the column is part of the primary key.
    pub primary_key: bool,

    /// Default value expression, if any.
    pub default_value: Option<String>,
}

impl Column {
    /// Creates a new nullable, non-key column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            required: false,
            primary_key: false,
            default_value: None,
        }
    }

    /// Sets whether the column is NOT NULL.
    pub fn required(self, required: bool) -> Self {
        Self { required, ..self }
    }

    /// Sets whether the column is part of the primary key.
    pub fn primary_key(self, primary_key: bool) -> Self {
        Self {
            primary_key,
            ..self
        }
    }

    /// Sets the default value.
    pub fn with_default(self, default: impl Into<String>) -> Self {
        Self {
            default_value: Some(default.into()),
            ..self
        }
    }
}
