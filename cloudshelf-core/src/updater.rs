use crate::error::ListingError;
use crate::node::{Node, NodeId, NodeTable};
use crate::resolver::{Placement, resolve_insertion};
use crate::sort::SortSpec;
use crate::window::{ListWindow, Position};

/// A node entering, leaving or moving inside one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repositioned {
    pub id: NodeId,
    pub from: Option<Position>,
    pub to: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub window: ListWindow,
    pub moved: Repositioned,
}

/// A single-node change as seen by one window.
#[derive(Debug, Clone, Copy)]
pub enum WindowChange<'a> {
    /// `node` is already stored in the node table; `previous` is the record
    /// it replaced, if any.
    Upsert {
        previous: Option<&'a Node>,
        node: &'a Node,
    },
    Remove(&'a NodeId),
}

/// Adds an untracked node at its resolved index, or to the unordered tier.
pub fn insert(
    window: &ListWindow,
    node: &Node,
    nodes: &NodeTable,
    spec: &SortSpec,
) -> Result<Update, ListingError> {
    let mut next = window.clone();
    let to = place(&mut next, node, nodes, spec)?;
    Ok(Update {
        window: next,
        moved: Repositioned {
            id: node.id.clone(),
            from: None,
            to: Some(to),
        },
    })
}

/// Detaches a tracked node and resolves it again; it may cross tiers.
pub fn reposition(
    window: &ListWindow,
    node: &Node,
    nodes: &NodeTable,
    spec: &SortSpec,
) -> Result<Update, ListingError> {
    let mut next = window.clone();
    let from = next.detach(&node.id);
    let to = place(&mut next, node, nodes, spec)?;
    Ok(Update {
        window: next,
        moved: Repositioned {
            id: node.id.clone(),
            from,
            to: Some(to),
        },
    })
}

/// Drops `id` from whichever tier holds it; `None` if it is not tracked.
pub fn remove(window: &ListWindow, id: &NodeId) -> Option<Update> {
    let mut next = window.clone();
    let from = next.detach(id)?;
    Some(Update {
        window: next,
        moved: Repositioned {
            id: id.clone(),
            from: Some(from),
            to: None,
        },
    })
}

/// Applies one change, returning the new window when its structure changed.
///
/// Updates that leave the sort key untouched need no structural change: the
/// node table already carries the new record.
pub fn apply_change(
    window: &ListWindow,
    change: WindowChange<'_>,
    nodes: &NodeTable,
    spec: &SortSpec,
) -> Result<Option<Update>, ListingError> {
    match change {
        WindowChange::Upsert { previous, node } => {
            if !window.contains(&node.id) {
                return insert(window, node, nodes, spec).map(Some);
            }
            let moves = previous.is_none_or(|before| spec.affects_order(before, node));
            if !moves {
                return Ok(None);
            }
            let update = reposition(window, node, nodes, spec)?;
            if update.moved.from == update.moved.to {
                return Ok(None);
            }
            Ok(Some(update))
        }
        WindowChange::Remove(id) => Ok(remove(window, id)),
    }
}

fn place(
    window: &mut ListWindow,
    node: &Node,
    nodes: &NodeTable,
    spec: &SortSpec,
) -> Result<Position, ListingError> {
    match resolve_insertion(&window.ordered, window.cursor.as_ref(), node, nodes, spec)? {
        Placement::At(index) => {
            window.ordered.insert(index, node.id.clone());
            Ok(Position::Ordered(index))
        }
        Placement::NotDetermined => {
            window.unordered.push(node.id.clone());
            Ok(Position::Unordered)
        }
    }
}
