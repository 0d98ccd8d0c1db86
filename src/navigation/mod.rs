//! Lazy navigation tree over the metadata cache.
//!
//! Nodes carry a typed [`NodeKind`] and an explicit parent reference. The
//! bracketed tag in a node's label is derived from its kind for display
//! only; nothing is ever parsed back out of label text.

mod tree;

pub use tree::NavigationTree;

use crate::cache::ObjectKind;
use crate::connection::Environment;
use std::fmt;

/// Opaque handle to a node in a [`NavigationTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Invisible root holding the connections.
    Root,
    Connection,
    Schema,
    /// Groups the base tables of a schema.
    Tables,
    /// Groups the views of a schema.
    Views,
    /// Placeholder group; sequences are not listed.
    Sequences,
    Table,
    View,
    Column,
    /// Leaf describing one property of a column.
    Detail,
}

impl NodeKind {
    /// Short bracketed tag shown in front of the node name.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::Schema => Some("[s]"),
            Self::Tables => Some("[T]"),
            Self::Views => Some("[V]"),
            Self::Sequences => Some("[SQ]"),
            Self::Table => Some("[t]"),
            Self::View => Some("[v]"),
            Self::Column => Some("[c]"),
            Self::Root | Self::Connection | Self::Detail => None,
        }
    }

    /// The object kind for table and view nodes and their collections.
    pub fn object_kind(&self) -> Option<ObjectKind> {
        match self {
            Self::Tables | Self::Table => Some(ObjectKind::Table),
            Self::Views | Self::View => Some(ObjectKind::View),
            _ => None,
        }
    }

    /// Returns true if nodes of this kind never have children.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Detail)
    }
}

/// A node in the navigation tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Display name: connection id, schema/table/column name or detail text.
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// True once the children have been fetched.
    pub populated: bool,
    /// Environment of a connection node, shown as its tag.
    pub env: Option<Environment>,
}

impl Node {
    fn new(kind: NodeKind, name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            name: name.into(),
            parent,
            children: Vec::new(),
            populated: kind.is_leaf(),
            env: None,
        }
    }

    /// Name decorated with the kind tag, e.g. `[t] users` or `[DEV] local`.
    pub fn label(&self) -> String {
        match (self.kind.tag(), self.env) {
            (Some(tag), _) => format!("{tag} {}", self.name),
            (None, Some(env)) => format!("{} {}", env.tag(), self.name),
            (None, None) => self.name.clone(),
        }
    }
}
