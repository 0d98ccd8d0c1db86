//! Tree state and the expand/refresh protocol.

use super::{Node, NodeId, NodeKind};
use crate::cache::{ClearKind, ObjectKind};
use crate::connection::{Connection, ConnectionRegistry};
use crate::db::Column;
use crate::error::{Result, TrellisError};
use std::collections::HashMap;
use tracing::debug;

/// Names of the three group nodes under every schema.
const GROUPS: [(NodeKind, &str); 3] = [
    (NodeKind::Tables, "Tables"),
    (NodeKind::Views, "Views"),
    (NodeKind::Sequences, "Sequences"),
];

/// Arena of navigation nodes rooted at an invisible root.
#[derive(Debug, Clone)]
pub struct NavigationTree {
    nodes: HashMap<NodeId, Node>,
    next_id: usize,
    root: NodeId,
}

impl Default for NavigationTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationTree {
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut root_node = Node::new(NodeKind::Root, "", None);
        root_node.populated = true;

        Self {
            nodes: HashMap::from([(root, root_node)]),
            next_id: 1,
            root,
        }
    }

    /// Builds a tree with one node per registered connection.
    pub fn from_registry(registry: &ConnectionRegistry) -> Self {
        let mut tree = Self::new();
        for connection in registry.iter() {
            tree.add_connection(connection);
        }
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    /// Number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Finds a direct child by name, ignoring case.
    pub fn child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.nodes.get(c).is_some_and(|n| n.name.eq_ignore_ascii_case(name)))
    }

    /// Finds the node for a connection id.
    pub fn connection_node(&self, connection_id: &str) -> Option<NodeId> {
        self.children(self.root)
            .iter()
            .copied()
            .find(|c| self.nodes.get(c).is_some_and(|n| n.name == connection_id))
    }

    /// Adds a collapsed node for `connection` under the root.
    pub fn add_connection(&mut self, connection: &Connection) -> NodeId {
        let id = self.insert(NodeKind::Connection, connection.id.clone(), self.root);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.env = Some(connection.env);
        }
        id
    }

    /// Removes a connection node and everything below it.
    pub fn remove_connection(&mut self, connection_id: &str) -> bool {
        let Some(id) = self.connection_node(connection_id) else {
            return false;
        };
        self.remove_descendants(id);
        self.nodes.remove(&id);
        if let Some(root) = self.nodes.get_mut(&self.root) {
            root.children.retain(|c| *c != id);
        }
        true
    }

    /// Ancestors of `id`, nearest first, excluding the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(parent) = current {
            if parent == self.root {
                break;
            }
            chain.push(parent);
            current = self.nodes.get(&parent).and_then(|n| n.parent);
        }
        chain
    }

    /// Nearest node of `kind` at or above `id`.
    fn nearest(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.nodes.get(n).is_some_and(|node| node.kind == kind))
    }

    /// Name of the nearest schema at or above `id`.
    pub fn schema_of(&self, id: NodeId) -> Option<&str> {
        let schema = self.nearest(id, NodeKind::Schema)?;
        self.nodes.get(&schema).map(|n| n.name.as_str())
    }

    /// Id of the connection that `id` belongs to.
    pub fn connection_of(&self, id: NodeId) -> Option<&str> {
        let connection = self.nearest(id, NodeKind::Connection)?;
        self.nodes.get(&connection).map(|n| n.name.as_str())
    }

    /// Populates the children of `id` and returns them.
    ///
    /// Returns an empty list if the node was already populated. Backend
    /// errors propagate and leave the node unpopulated.
    pub async fn expand(
        &mut self,
        id: NodeId,
        registry: &mut ConnectionRegistry,
    ) -> Result<Vec<NodeId>> {
        let node = self.get(id)?;
        if node.populated {
            return Ok(Vec::new());
        }
        let kind = node.kind;
        let name = node.name.clone();

        let children: Vec<(NodeKind, String)> = match kind {
            NodeKind::Root | NodeKind::Detail | NodeKind::Sequences => Vec::new(),
            NodeKind::Schema => GROUPS
                .iter()
                .map(|(kind, name)| (*kind, name.to_string()))
                .collect(),
            _ => {
                let connection = self.connection_for(id, registry)?;
                self.fetch_children(id, kind, &name, connection).await?
            }
        };

        let ids: Vec<NodeId> = children
            .into_iter()
            .map(|(child_kind, child_name)| self.insert(child_kind, child_name, id))
            .collect();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.populated = true;
        }
        debug!("Expanded {} into {} node(s)", id, ids.len());
        Ok(ids)
    }

    async fn fetch_children(
        &self,
        id: NodeId,
        kind: NodeKind,
        name: &str,
        connection: &mut Connection,
    ) -> Result<Vec<(NodeKind, String)>> {
        let cache = &mut connection.cache;
        let schema = self.schema_of(id).unwrap_or_default().to_string();

        let children: Vec<(NodeKind, String)> = match kind {
            NodeKind::Connection => cache
                .schemas()
                .await?
                .into_iter()
                .map(|s| (NodeKind::Schema, s.name.clone()))
                .collect(),
            NodeKind::Tables => cache
                .tables(&schema)
                .await?
                .into_iter()
                .map(|t| (NodeKind::Table, t.name.clone()))
                .collect(),
            NodeKind::Views => cache
                .views(&schema)
                .await?
                .into_iter()
                .map(|t| (NodeKind::View, t.name.clone()))
                .collect(),
            NodeKind::Table | NodeKind::View => {
                let object_kind = kind.object_kind().unwrap_or(ObjectKind::Table);
                cache
                    .columns(&schema, name, object_kind)
                    .await?
                    .into_iter()
                    .map(|c| (NodeKind::Column, c.name.clone()))
                    .collect()
            }
            NodeKind::Column => {
                let parent = self.get(self.parent_of(id)?)?;
                let object_kind = parent.kind.object_kind().unwrap_or(ObjectKind::Table);
                cache
                    .columns(&schema, &parent.name, object_kind)
                    .await?
                    .into_iter()
                    .find(|c| c.name.eq_ignore_ascii_case(name))
                    .map(column_details)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|detail| (NodeKind::Detail, detail))
                    .collect()
            }
            NodeKind::Root | NodeKind::Schema | NodeKind::Sequences | NodeKind::Detail => {
                Vec::new()
            }
        };
        Ok(children)
    }

    /// Invalidates the cache level behind `id`'s parent and collapses it.
    ///
    /// The parent owns the list `id` belongs to, so:
    /// - a table or view invalidates its whole group;
    /// - a column invalidates just its table or view;
    /// - a group invalidates its schema;
    /// - a detail refreshes its column;
    /// - a schema clears the whole connection.
    ///
    /// Returns the node that was collapsed.
    pub fn refresh(&mut self, id: NodeId, registry: &mut ConnectionRegistry) -> Result<NodeId> {
        let node = self.get(id)?;
        if matches!(node.kind, NodeKind::Root | NodeKind::Connection) {
            return self.refresh_connection(id, registry);
        }

        let parent_id = self.parent_of(id)?;
        let parent = self.get(parent_id)?;
        let (parent_kind, parent_name) = (parent.kind, parent.name.clone());

        if parent_kind == NodeKind::Column {
            return self.refresh(parent_id, registry);
        }

        let Some(schema) = self.schema_of(parent_id).map(String::from) else {
            return self.refresh_connection(parent_id, registry);
        };

        let (clear, object) = match parent_kind {
            NodeKind::Schema => (Some(ClearKind::Schema), None),
            NodeKind::Tables => (Some(ClearKind::Tables), None),
            NodeKind::Views => (Some(ClearKind::Views), None),
            NodeKind::Table => (Some(ClearKind::Table), Some(parent_name)),
            NodeKind::View => (Some(ClearKind::View), Some(parent_name)),
            _ => (None, None),
        };

        if let Some(clear) = clear {
            let connection = self.connection_for(parent_id, registry)?;
            connection
                .cache
                .clear_by_type(clear, &schema, object.as_deref());
        }

        self.collapse(parent_id);
        Ok(parent_id)
    }

    /// Clears the whole cache of the connection `id` belongs to and
    /// collapses its node, whatever the depth of `id`.
    pub fn refresh_connection(
        &mut self,
        id: NodeId,
        registry: &mut ConnectionRegistry,
    ) -> Result<NodeId> {
        let connection_node = self
            .nearest(id, NodeKind::Connection)
            .ok_or_else(|| TrellisError::internal(format!("Node {id} has no connection")))?;

        self.connection_for(connection_node, registry)?.cache.clear();
        self.collapse(connection_node);
        Ok(connection_node)
    }

    /// Expands `from` and its descendants down to `depth` levels.
    pub async fn expand_to_depth(
        &mut self,
        from: NodeId,
        depth: usize,
        registry: &mut ConnectionRegistry,
    ) -> Result<()> {
        let mut pending = vec![(from, 0usize)];
        while let Some((id, level)) = pending.pop() {
            if level >= depth {
                continue;
            }
            self.expand(id, registry).await?;
            pending.extend(self.children(id).iter().rev().map(|c| (*c, level + 1)));
        }
        Ok(())
    }

    /// Depth-first walk below `from` as `(depth, node)` pairs.
    pub fn walk(&self, from: NodeId) -> Vec<(usize, &Node)> {
        let mut out = Vec::new();
        let mut stack: Vec<(NodeId, usize)> = self
            .children(from)
            .iter()
            .rev()
            .map(|c| (*c, 0))
            .collect();
        while let Some((id, depth)) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                out.push((depth, node));
                stack.extend(node.children.iter().rev().map(|c| (*c, depth + 1)));
            }
        }
        out
    }

    fn get(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| TrellisError::internal(format!("Unknown navigation node {id}")))
    }

    fn parent_of(&self, id: NodeId) -> Result<NodeId> {
        self.get(id)?
            .parent
            .ok_or_else(|| TrellisError::internal(format!("Node {id} has no parent")))
    }

    fn connection_for<'r>(
        &self,
        id: NodeId,
        registry: &'r mut ConnectionRegistry,
    ) -> Result<&'r mut Connection> {
        let connection_id = self
            .connection_of(id)
            .ok_or_else(|| TrellisError::internal(format!("Node {id} has no connection")))?;
        registry.get_mut(connection_id).ok_or_else(|| {
            TrellisError::internal(format!("Connection '{connection_id}' is not registered"))
        })
    }

    fn insert(&mut self, kind: NodeKind, name: String, parent: NodeId) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(kind, name, Some(parent)));
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.push(id);
        }
        id
    }

    fn collapse(&mut self, id: NodeId) {
        self.remove_descendants(id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children.clear();
            node.populated = node.kind.is_leaf();
        }
        debug!("Collapsed {}", id);
    }

    fn remove_descendants(&mut self, id: NodeId) {
        let mut stack = self.children(id).to_vec();
        while let Some(child) = stack.pop() {
            if let Some(node) = self.nodes.remove(&child) {
                stack.extend(node.children);
            }
        }
    }
}

/// Leaf texts describing a column.
fn column_details(column: &Column) -> Vec<String> {
    let mut details = vec![column.data_type.clone()];
    if column.required {
        details.push("NOT NULL".to_string());
    }
    if column.primary_key {
        details.push("PRIMARY KEY".to_string());
    }
    if let Some(default) = &column.default_value {
        details.push(format!("DEFAULT {default}"));
    }
    details
}
