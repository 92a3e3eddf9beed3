use serde::Serialize;

use crate::error::ListingError;
use crate::node::{Node, NodeId, NodeTable};
use crate::window::ListWindow;

/// Flat view of a window handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub items: Vec<Node>,
    pub has_more: bool,
    pub loaded: bool,
}

/// Ordered tier followed by the unordered tier in insertion order.
pub fn project(window: &ListWindow) -> Vec<NodeId> {
    window
        .ordered()
        .iter()
        .chain(window.unordered())
        .cloned()
        .collect()
}

pub fn read(window: &ListWindow, nodes: &NodeTable) -> Result<Listing, ListingError> {
    let items = window
        .ordered()
        .iter()
        .chain(window.unordered())
        .map(|id| {
            nodes
                .get(id)
                .cloned()
                .ok_or_else(|| ListingError::UnknownNode(id.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Listing {
        items,
        has_more: window.has_more(),
        loaded: window.is_loaded(),
    })
}
