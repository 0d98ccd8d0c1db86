//! The running set of connections.

use super::Connection;
use crate::error::{Result, TrellisError};
use tracing::info;

/// Ordered set of open connections, unique by id.
///
/// Created at startup from the persisted list and mutated by add, edit
/// and delete operations; persisting it is the caller's job.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Vec<Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection that has already passed its connection test.
    ///
    /// Fails if the id is empty or already taken.
    pub fn add(&mut self, connection: Connection) -> Result<()> {
        self.check_id(&connection.id, None)?;
        info!("Added connection {}", connection.id);
        self.connections.push(connection);
        Ok(())
    }

    /// Replaces the connection registered as `id`, keeping its position.
    ///
    /// The replacement may carry a new id as long as no other connection
    /// uses it.
    pub fn replace(&mut self, id: &str, connection: Connection) -> Result<()> {
        let index = self
            .position(id)
            .ok_or_else(|| TrellisError::config(format!("Connection '{id}' not found")))?;
        self.check_id(&connection.id, Some(index))?;
        info!("Replaced connection {} with {}", id, connection.id);
        self.connections[index] = connection;
        Ok(())
    }

    /// Removes and returns the connection registered as `id`.
    pub fn remove(&mut self, id: &str) -> Option<Connection> {
        let index = self.position(id)?;
        info!("Removed connection {}", id);
        Some(self.connections.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.connections.iter().map(|c| c.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.connections.iter().position(|c| c.id == id)
    }

    fn check_id(&self, id: &str, replacing: Option<usize>) -> Result<()> {
        if id.trim().is_empty() {
            return Err(TrellisError::config("Connection id must not be empty"));
        }
        match self.position(id) {
            Some(existing) if Some(existing) != replacing => Err(TrellisError::config(format!(
                "A connection named '{id}' already exists"
            ))),
            _ => Ok(()),
        }
    }
}
