use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// A file or folder as known to the client.
///
/// Timestamps are unix seconds. `parent_path` identifies the containing
/// folder the same way folder collections are keyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub parent_path: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub media_type: Option<String>,
}

impl Node {
    pub fn file(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self::with_kind(id.into(), NodeKind::File, name.into())
    }

    pub fn folder(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self::with_kind(id.into(), NodeKind::Folder, name.into())
    }

    fn with_kind(id: NodeId, kind: NodeKind, name: String) -> Self {
        Self {
            id,
            kind,
            path: format!("/{name}"),
            name,
            parent_path: Some("/".to_string()),
            size: None,
            created_at: None,
            updated_at: None,
            media_type: None,
        }
    }

    pub fn in_folder(mut self, parent: &str) -> Self {
        let parent = parent.trim_end_matches('/');
        self.path = format!("{parent}/{}", self.name);
        self.parent_path = Some(if parent.is_empty() {
            "/".to_string()
        } else {
            parent.to_string()
        });
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_updated_at(mut self, updated_at: i64) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }
}

/// Normalized node records shared by every window of a cache.
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    nodes: HashMap<NodeId, Node>,
}

impl NodeTable {
    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Stores `node`, returning the record it replaced.
    pub fn upsert(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.id.clone(), node)
    }

    pub fn remove(&mut self, id: &NodeId) -> Option<Node> {
        self.nodes.remove(id)
    }

    pub fn retain_referenced(&mut self, referenced: &HashSet<&NodeId>) {
        self.nodes.retain(|id, _| referenced.contains(id));
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<Node> for NodeTable {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        let mut table = NodeTable::default();
        for node in iter {
            table.upsert(node);
        }
        table
    }
}
