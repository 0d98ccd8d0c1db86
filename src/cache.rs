//! Memoized schema metadata for one connection.
//!
//! [`MetadataCache`] wraps a [`Connector`] and turns its flat enumeration
//! calls into a lazily populated hierarchy: schemas, then per-schema table
//! and view lists, then per-object columns. Each level is fetched at most
//! once until it is explicitly invalidated. Invalidation drops a subtree
//! back to the "not loaded" state without removing the entry from its
//! parent, so anything not invalidated keeps its data.

use crate::db::{keyed, name_key, Column, Connector, NameMap, Schema, Table};
use crate::error::{Result, TrellisError};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub use crate::db::ObjectKind;

/// Granularity of a selective invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearKind {
    /// Every schema; same as [`MetadataCache::clear`].
    Schemas,
    /// One schema: drops both of its object lists.
    Schema,
    /// The table list of one schema.
    Tables,
    /// The view list of one schema.
    Views,
    /// The columns of one table.
    Table,
    /// The columns of one view.
    View,
}

impl ClearKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schemas => "schemas",
            Self::Schema => "schema",
            Self::Tables => "tables",
            Self::Views => "views",
            Self::Table => "table",
            Self::View => "view",
        }
    }
}

impl fmt::Display for ClearKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClearKind {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "schemas" => Ok(Self::Schemas),
            "schema" => Ok(Self::Schema),
            "tables" => Ok(Self::Tables),
            "views" => Ok(Self::Views),
            "table" => Ok(Self::Table),
            "view" => Ok(Self::View),
            other => Err(TrellisError::config(format!(
                "Unknown invalidation kind '{other}'"
            ))),
        }
    }
}

fn collection(schema: &Schema, kind: ObjectKind) -> Option<&NameMap<Table>> {
    match kind {
        ObjectKind::Table => schema.tables.as_ref(),
        ObjectKind::View => schema.views.as_ref(),
    }
}

fn collection_mut(schema: &mut Schema, kind: ObjectKind) -> &mut Option<NameMap<Table>> {
    match kind {
        ObjectKind::Table => &mut schema.tables,
        ObjectKind::View => &mut schema.views,
    }
}

/// Lazily populated metadata hierarchy over one connector.
pub struct MetadataCache {
    connector: Box<dyn Connector>,
    schemas: NameMap<Schema>,
    connected: bool,
}

impl fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCache")
            .field("connector", &self.connector.connection_identity())
            .field("schemas", &self.schemas.len())
            .field("connected", &self.connected)
            .finish()
    }
}

impl MetadataCache {
    /// Creates an empty cache; nothing is fetched until first access.
    pub fn new(connector: Box<dyn Connector>) -> Self {
        Self {
            connector,
            schemas: NameMap::new(),
            connected: false,
        }
    }

    /// The wrapped connector, for statement execution.
    pub fn connector(&self) -> &dyn Connector {
        self.connector.as_ref()
    }

    /// True once `schemas()` has succeeded at least once.
    ///
    /// The flag is one-way: clearing the cache does not reset it.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Returns all schemas, listing them from the backend if none are cached.
    pub async fn schemas(&mut self) -> Result<Vec<&Schema>> {
        self.load_schemas().await?;
        Ok(self.schemas.values().collect())
    }

    /// Returns the base tables of `schema`.
    pub async fn tables(&mut self, schema: &str) -> Result<Vec<&Table>> {
        self.objects(schema, ObjectKind::Table).await
    }

    /// Returns the views of `schema`.
    pub async fn views(&mut self, schema: &str) -> Result<Vec<&Table>> {
        self.objects(schema, ObjectKind::View).await
    }

    /// Returns the tables or views of `schema`, depending on `kind`.
    ///
    /// An unknown schema yields an empty list.
    pub async fn objects(&mut self, schema: &str, kind: ObjectKind) -> Result<Vec<&Table>> {
        self.load_objects(schema, kind).await?;
        Ok(self
            .schemas
            .get(&name_key(schema))
            .and_then(|s| collection(s, kind))
            .map(|objects| objects.values().collect())
            .unwrap_or_default())
    }

    /// Returns the columns of a table or view.
    ///
    /// Loads, in order and only where missing: the schema list, the
    /// schema's table (or view) list, then the object's columns. An
    /// unknown schema or object yields an empty list.
    pub async fn columns(
        &mut self,
        schema: &str,
        object: &str,
        kind: ObjectKind,
    ) -> Result<Vec<&Column>> {
        self.load_objects(schema, kind).await?;

        let schema_key = name_key(schema);
        let object_key = name_key(object);

        let pending = match self.schemas.get(&schema_key) {
            Some(entry) => match collection(entry, kind).and_then(|o| o.get(&object_key)) {
                Some(table) if !table.columns_loaded() => {
                    Some((entry.name.clone(), table.name.clone()))
                }
                Some(_) => None,
                None => {
                    debug!("No {} named {} in schema {}", kind, object, schema);
                    return Ok(Vec::new());
                }
            },
            None => return Ok(Vec::new()),
        };

        if let Some((schema_name, object_name)) = pending {
            let listed = self
                .connector
                .list_columns(&schema_name, &object_name, kind)
                .await?;
            debug!(
                "Loaded {} column(s) for {}.{}",
                listed.len(),
                schema_name,
                object_name
            );

            if let Some(table) = self
                .schemas
                .get_mut(&schema_key)
                .and_then(|s| collection_mut(s, kind).as_mut())
                .and_then(|o| o.get_mut(&object_key))
            {
                table.columns = Some(keyed(listed, |c| c.name.as_str()));
            }
        }

        Ok(self
            .schemas
            .get(&schema_key)
            .and_then(|s| collection(s, kind))
            .and_then(|o| o.get(&object_key))
            .and_then(|t| t.columns.as_ref())
            .map(|columns| columns.values().collect())
            .unwrap_or_default())
    }

    /// Drops everything; the next access re-lists schemas.
    pub fn clear(&mut self) {
        debug!("Clearing metadata cache for {}", self.connector.connection_identity());
        self.schemas.clear();
    }

    /// Invalidates one level of the hierarchy.
    ///
    /// `object` names the table or view for [`ClearKind::Table`] and
    /// [`ClearKind::View`] and is ignored otherwise. Invalidating something
    /// that is not cached does nothing.
    pub fn clear_by_type(&mut self, kind: ClearKind, schema: &str, object: Option<&str>) {
        if kind == ClearKind::Schemas {
            self.clear();
            return;
        }

        let Some(entry) = self.schemas.get_mut(&name_key(schema)) else {
            debug!("Ignoring {} invalidation: schema {} is not cached", kind, schema);
            return;
        };

        match kind {
            ClearKind::Schemas => {}
            ClearKind::Schema => {
                *entry = Schema::new(entry.name.clone());
            }
            ClearKind::Tables => entry.tables = None,
            ClearKind::Views => entry.views = None,
            ClearKind::Table | ClearKind::View => {
                let object_kind = if kind == ClearKind::Table {
                    ObjectKind::Table
                } else {
                    ObjectKind::View
                };
                let Some(name) = object else {
                    debug!("Ignoring {} invalidation without an object name", kind);
                    return;
                };
                match collection_mut(entry, object_kind)
                    .as_mut()
                    .and_then(|objects| objects.get_mut(&name_key(name)))
                {
                    Some(table) => *table = Table::new(table.name.clone()),
                    None => {
                        debug!("Ignoring {} invalidation: {}.{} is not cached", kind, schema, name);
                        return;
                    }
                }
            }
        }

        match object {
            Some(name) => debug!("Invalidated {} {}.{}", kind, schema, name),
            None => debug!("Invalidated {} {}", kind, schema),
        }
    }

    async fn load_schemas(&mut self) -> Result<()> {
        if self.schemas.is_empty() {
            let listed = self.connector.list_schemas().await?;
            debug!("Loaded {} schema(s)", listed.len());
            self.schemas = keyed(listed, |s| s.name.as_str());
        }
        self.connected = true;
        Ok(())
    }

    async fn load_objects(&mut self, schema: &str, kind: ObjectKind) -> Result<()> {
        self.load_schemas().await?;

        let key = name_key(schema);
        let schema_name = match self.schemas.get(&key) {
            Some(entry) if collection(entry, kind).is_none() => entry.name.clone(),
            Some(_) => return Ok(()),
            None => {
                debug!("Schema {} is not known to this connection", schema);
                return Ok(());
            }
        };

        let listed = match kind {
            ObjectKind::Table => self.connector.list_tables(&schema_name).await?,
            ObjectKind::View => self.connector.list_views(&schema_name).await?,
        };
        debug!("Loaded {} {}(s) in {}", listed.len(), kind, schema_name);

        if let Some(entry) = self.schemas.get_mut(&key) {
            *collection_mut(entry, kind) = Some(keyed(listed, |t| t.name.as_str()));
        }
        Ok(())
    }
}
