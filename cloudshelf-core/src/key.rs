use serde::{Deserialize, Serialize};

use crate::node::Node;
use crate::sort::SortSpec;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(default)]
    pub media_type: Option<String>,
}

impl SearchFilter {
    pub fn media_type(media_type: impl Into<String>) -> Self {
        Self {
            media_type: Some(media_type.into()),
        }
    }

    /// Search collections list files only.
    pub fn matches(&self, node: &Node) -> bool {
        if node.is_folder() {
            return false;
        }
        match &self.media_type {
            Some(expected) => node.media_type.as_deref() == Some(expected.as_str()),
            None => true,
        }
    }
}

/// Identifies a remote collection independently of its ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CollectionKey {
    /// Children of the folder at this path.
    Folder(String),
    Search(SearchFilter),
    Trash,
}

impl CollectionKey {
    pub fn folder(path: impl Into<String>) -> Self {
        CollectionKey::Folder(path.into())
    }

    /// Whether the record alone proves `node` is not a member.
    pub fn rules_out(&self, node: &Node) -> bool {
        match self {
            CollectionKey::Search(filter) => !filter.matches(node),
            CollectionKey::Folder(_) | CollectionKey::Trash => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListKey {
    pub collection: CollectionKey,
    pub sort: SortSpec,
}

impl ListKey {
    pub fn new(collection: CollectionKey, sort: SortSpec) -> Self {
        Self { collection, sort }
    }
}
