use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ListingError;
use crate::node::{Node, NodeId, NodeTable};
use crate::resolver::{Placement, resolve_insertion};
use crate::sort::SortSpec;
use crate::window::{Cursor, ListWindow};

/// One page of a sorted remote collection, in remote order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<Node>,
    pub cursor: Option<Cursor>,
}

impl Page {
    pub fn ids(&self) -> Vec<NodeId> {
        self.items.iter().map(|node| node.id.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    First,
    Next,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub window: ListWindow,
    /// Ids that left the unordered tier, with their final index.
    pub resolved: Vec<(NodeId, usize)>,
}

/// Builds a fresh window from the first page; pending items are dropped.
pub fn merge_first_page(ids: &[NodeId], cursor: Option<Cursor>) -> ListWindow {
    let mut seen = HashSet::with_capacity(ids.len());
    let ordered = ids
        .iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect();
    ListWindow {
        ordered,
        cursor,
        unordered: Vec::new(),
        loaded: true,
    }
}

/// Appends a following page and re-resolves the unordered tier.
///
/// Incoming ids already in the ordered tier keep their index: offset
/// pagination repeats loaded items after local insertions. Incoming ids
/// from the unordered tier take the position the remote reports.
pub fn merge_next_page(
    window: &ListWindow,
    ids: &[NodeId],
    cursor: Option<Cursor>,
    nodes: &NodeTable,
    spec: &SortSpec,
) -> Result<MergeOutcome, ListingError> {
    let mut next = window.clone();
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids.iter().filter(|id| seen.insert(*id)) {
        if next.ordered.contains(id) {
            continue;
        }
        next.detach(id);
        next.ordered.push(id.clone());
    }
    next.cursor = cursor;
    next.loaded = true;

    let pending = std::mem::take(&mut next.unordered);
    let mut resolved = Vec::new();
    for id in pending {
        let node = nodes
            .get(&id)
            .ok_or_else(|| ListingError::UnknownNode(id.clone()))?;
        match resolve_insertion(&next.ordered, next.cursor.as_ref(), node, nodes, spec)? {
            Placement::At(index) => {
                next.ordered.insert(index, id.clone());
                resolved.push((id, index));
            }
            Placement::NotDetermined => next.unordered.push(id),
        }
    }

    Ok(MergeOutcome {
        window: next,
        resolved,
    })
}
