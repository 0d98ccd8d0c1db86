//! Connection list persistence.
//!
//! The list is a JSON array of records:
//!
//! ```json
//! [{"id": "local", "database": "<enc>", "host": "<enc>", "port": 5432,
//!   "user": "<enc>", "password": "<enc>", "type": "POSTGRES", "env": "DEV"}]
//! ```
//!
//! `database`, `host`, `user` and `password` are encrypted with
//! [`FieldCipher`]; everything above this module only sees plaintext.

use super::crypto::FieldCipher;
use crate::connection::{Connection, ConnectionRegistry, Environment};
use crate::db::{resolve_connector, BackendKind, ConnectionParams, DummyConnector};
use crate::error::{Result, TrellisError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// On-disk shape of one connection. Sensitive fields hold ciphertext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub env: String,
}

/// A decrypted connection definition.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedConnection {
    pub id: String,
    pub env: Environment,
    pub backend: BackendKind,
    pub params: ConnectionParams,
    /// The stored `type` when it names no known backend.
    pub backend_tag: Option<String>,
}

impl SavedConnection {
    /// Captures the definition of an open connection.
    pub fn from_connection(connection: &Connection) -> Self {
        Self {
            id: connection.id.clone(),
            env: connection.env,
            backend: connection.backend,
            params: connection.params.clone(),
            backend_tag: connection.backend_tag.clone(),
        }
    }

    fn from_record(record: ConnectionRecord, cipher: &FieldCipher) -> Result<Self> {
        let env = Environment::parse(&record.env).unwrap_or_else(|| {
            warn!("Connection {} has unknown env '{}', using DEV", record.id, record.env);
            Environment::Dev
        });

        let backend_tag = match BackendKind::parse(&record.kind) {
            None if !record.kind.trim().is_empty() => {
                warn!("Connection {} has unknown type '{}'", record.id, record.kind);
                Some(record.kind.clone())
            }
            _ => None,
        };

        Ok(Self {
            backend: BackendKind::parse_or_dummy(&record.kind),
            backend_tag,
            env,
            params: ConnectionParams {
                database: cipher.decrypt_field(record.database.as_deref())?,
                host: cipher.decrypt_field(record.host.as_deref())?,
                port: (record.port != 0).then_some(record.port),
                user: cipher.decrypt_field(record.user.as_deref())?,
                password: cipher.decrypt_field(record.password.as_deref())?,
            },
            id: record.id,
        })
    }

    fn to_record(&self, cipher: &FieldCipher) -> Result<ConnectionRecord> {
        Ok(ConnectionRecord {
            id: self.id.clone(),
            database: cipher.encrypt_field(self.params.database.as_deref())?,
            host: cipher.encrypt_field(self.params.host.as_deref())?,
            port: self.params.port.unwrap_or(0),
            user: cipher.encrypt_field(self.params.user.as_deref())?,
            password: cipher.encrypt_field(self.params.password.as_deref())?,
            kind: self
                .backend_tag
                .clone()
                .unwrap_or_else(|| self.backend.as_str().to_string()),
            env: self.env.as_str().to_string(),
        })
    }

    /// Builds the connection without testing it.
    ///
    /// A saved definition whose required fields are missing falls back to
    /// the fixture backend; its parameters are kept so saving it again does
    /// not lose them.
    pub fn restore(self) -> Connection {
        let connector = match resolve_connector(self.backend, &self.params) {
            Ok(connector) => connector,
            Err(e) => {
                warn!("Connection {} uses the fixture backend: {}", self.id, e);
                Box::new(DummyConnector::new())
            }
        };
        let mut connection =
            Connection::with_connector(self.id, self.env, self.backend, self.params, connector);
        connection.backend_tag = self.backend_tag;
        connection
    }
}

/// Loads and decrypts the connection list.
///
/// A missing file is created containing an empty list.
pub fn load(path: &Path, cipher: &FieldCipher) -> Result<Vec<SavedConnection>> {
    if !path.exists() {
        info!("Creating empty connection list at {}", path.display());
        write_json(path, "[]")?;
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        TrellisError::persistence(format!("Failed to read {}: {e}", path.display()))
    })?;
    let records: Vec<ConnectionRecord> = serde_json::from_str(&content).map_err(|e| {
        TrellisError::persistence(format!("Malformed connection list {}: {e}", path.display()))
    })?;

    debug!("Loaded {} connection(s) from {}", records.len(), path.display());
    records
        .into_iter()
        .map(|record| SavedConnection::from_record(record, cipher))
        .collect()
}

/// Encrypts and writes the connection list, replacing the file.
pub fn save(path: &Path, cipher: &FieldCipher, connections: &[SavedConnection]) -> Result<()> {
    let records = connections
        .iter()
        .map(|c| c.to_record(cipher))
        .collect::<Result<Vec<_>>>()?;
    let json = serde_json::to_string_pretty(&records)
        .map_err(|e| TrellisError::persistence(format!("Failed to serialize connections: {e}")))?;

    write_json(path, &json)?;
    debug!("Saved {} connection(s) to {}", records.len(), path.display());
    Ok(())
}

/// Loads the connection list into a registry of (untested) connections.
pub fn load_registry(path: &Path, cipher: &FieldCipher) -> Result<ConnectionRegistry> {
    let mut registry = ConnectionRegistry::new();
    for saved in load(path, cipher)? {
        let id = saved.id.clone();
        if let Err(e) = registry.add(saved.restore()) {
            warn!("Skipping saved connection '{}': {}", id, e);
        }
    }
    Ok(registry)
}

/// Saves every connection in `registry`.
pub fn save_registry(path: &Path, cipher: &FieldCipher, registry: &ConnectionRegistry) -> Result<()> {
    let saved: Vec<SavedConnection> = registry.iter().map(SavedConnection::from_connection).collect();
    save(path, cipher, &saved)
}

fn write_json(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            TrellisError::persistence(format!("Failed to create {}: {e}", parent.display()))
        })?;
    }
    std::fs::write(path, content)
        .map_err(|e| TrellisError::persistence(format!("Failed to write {}: {e}", path.display())))
}
