use serde::{Deserialize, Serialize};

use crate::key::CollectionKey;
use crate::node::{Node, NodeId};

/// Mutation notification routed to the listing cache.
///
/// `collections` names the collections the change concerns. For `Removed`
/// an empty list means the node is gone from every collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MutationEvent {
    Created {
        node: Node,
        collections: Vec<CollectionKey>,
    },
    Updated {
        node: Node,
        collections: Vec<CollectionKey>,
    },
    Removed {
        id: NodeId,
        collections: Vec<CollectionKey>,
    },
}

impl MutationEvent {
    pub fn node_id(&self) -> &NodeId {
        match self {
            MutationEvent::Created { node, .. } | MutationEvent::Updated { node, .. } => &node.id,
            MutationEvent::Removed { id, .. } => id,
        }
    }

    pub fn collections(&self) -> &[CollectionKey] {
        match self {
            MutationEvent::Created { collections, .. }
            | MutationEvent::Updated { collections, .. }
            | MutationEvent::Removed { collections, .. } => collections,
        }
    }
}
