//! Persistence layer for Trellis.
//!
//! Stores the connection list as a JSON file whose sensitive fields are
//! encrypted with a locally held key.

pub mod connections;
pub mod crypto;

pub use connections::{ConnectionRecord, SavedConnection};
pub use crypto::FieldCipher;

use crate::config::StorageConfig;
use crate::connection::ConnectionRegistry;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// The connection list file together with the key that protects it.
#[derive(Debug, Clone)]
pub struct ConnectionStore {
    path: PathBuf,
    cipher: FieldCipher,
}

impl ConnectionStore {
    /// Opens the store described by `storage`, creating the key if needed.
    pub fn open(storage: &StorageConfig) -> Result<Self> {
        let cipher = FieldCipher::load_or_create(&storage.key_path())?;
        Ok(Self::new(storage.connections_path(), cipher))
    }

    pub fn new(path: impl Into<PathBuf>, cipher: FieldCipher) -> Self {
        Self {
            path: path.into(),
            cipher,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decrypted connection definitions, without opening any of them.
    pub fn load(&self) -> Result<Vec<SavedConnection>> {
        connections::load(&self.path, &self.cipher)
    }

    pub fn load_registry(&self) -> Result<ConnectionRegistry> {
        connections::load_registry(&self.path, &self.cipher)
    }

    pub fn save_registry(&self, registry: &ConnectionRegistry) -> Result<()> {
        connections::save_registry(&self.path, &self.cipher, registry)
    }
}
