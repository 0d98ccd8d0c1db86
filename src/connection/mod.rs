//! Connection management for Trellis.
//!
//! A [`Connection`] pairs user-facing attributes (id, environment) with a
//! live connector and the metadata cache wrapped around it. Each connection
//! owns its cache and connector exclusively.

mod environment;
mod registry;

pub use environment::Environment;
pub use registry::ConnectionRegistry;

use crate::cache::MetadataCache;
use crate::db::{resolve_connector, BackendKind, ConnectionParams, Connector};
use crate::error::{Result, TrellisError};
use tracing::info;

/// An open database connection.
#[derive(Debug)]
pub struct Connection {
    /// User-chosen label, unique within the registry.
    pub id: String,
    pub env: Environment,
    pub backend: BackendKind,
    /// Decrypted parameters, kept so the connection can be saved again.
    pub params: ConnectionParams,
    /// Saved `type` that named no known backend; written back as found.
    pub backend_tag: Option<String>,
    pub cache: MetadataCache,
}

impl Connection {
    /// Resolves the connector and checks that the backend is reachable.
    ///
    /// Missing fields fail with a configuration error before any I/O; an
    /// unreachable backend fails with a connection error. Either way no
    /// connection is created.
    pub async fn open(
        id: impl Into<String>,
        env: Environment,
        backend: BackendKind,
        params: ConnectionParams,
    ) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TrellisError::config("Connection id must not be empty"));
        }

        let connector = resolve_connector(backend, &params)?;
        connector.test_connection().await?;
        info!("Opened {} connection {} ({})", backend, id, connector.connection_identity());

        Ok(Self::with_connector(id, env, backend, params, connector))
    }

    /// Wraps an already constructed connector without testing it.
    pub fn with_connector(
        id: impl Into<String>,
        env: Environment,
        backend: BackendKind,
        params: ConnectionParams,
        connector: Box<dyn Connector>,
    ) -> Self {
        Self {
            id: id.into(),
            env,
            backend,
            params,
            backend_tag: None,
            cache: MetadataCache::new(connector),
        }
    }

    pub fn connector(&self) -> &dyn Connector {
        self.cache.connector()
    }

    /// Stable identifier: lower-cased `id_env_database_user`.
    pub fn uid(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.id,
            self.env,
            self.params.database.as_deref().unwrap_or_default(),
            self.params.user.as_deref().unwrap_or_default()
        )
        .to_lowercase()
    }

    /// Label shown in connection lists, e.g. `[DEV] local (SQLITE)`.
    pub fn label(&self) -> String {
        format!("{} {} ({})", self.env.tag(), self.id, self.backend.as_str())
    }
}
