use std::cmp::Ordering;

use crate::error::ListingError;
use crate::node::{Node, NodeId, NodeTable};
use crate::sort::{SortSpec, compare};
use crate::window::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    At(usize),
    /// The item sorts after every loaded item while more remote items
    /// exist, so its place cannot be decided locally.
    NotDetermined,
}

/// Finds where `item` belongs in the sorted `ordered` prefix.
///
/// An item sorting after everything loaded is only placed at the end when
/// `cursor` is `None`; otherwise unfetched remote items may sort between the
/// last loaded item and this one. An entry equal to `item.id` is ignored.
pub fn resolve_insertion(
    ordered: &[NodeId],
    cursor: Option<&Cursor>,
    item: &Node,
    nodes: &NodeTable,
    spec: &SortSpec,
) -> Result<Placement, ListingError> {
    let mut index = 0;
    for id in ordered {
        if *id == item.id {
            continue;
        }
        let loaded = nodes
            .get(id)
            .ok_or_else(|| ListingError::UnknownNode(id.clone()))?;
        if compare(loaded, item, spec) == Ordering::Greater {
            return Ok(Placement::At(index));
        }
        index += 1;
    }
    if cursor.is_none() {
        Ok(Placement::At(index))
    } else {
        Ok(Placement::NotDetermined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Vec<NodeId>, NodeTable) {
        let nodes: NodeTable = ["A", "B", "C"]
            .into_iter()
            .map(|name| Node::file(name, name))
            .collect();
        let ordered = vec!["A".into(), "B".into(), "C".into()];
        (ordered, nodes)
    }

    #[test]
    fn places_before_first_later_item() {
        let (ordered, nodes) = setup();
        let cursor = Cursor::new("3");
        let item = Node::file("D", "Ba");
        let placement =
            resolve_insertion(&ordered, Some(&cursor), &item, &nodes, &SortSpec::by_name())
                .unwrap();
        assert_eq!(placement, Placement::At(2));
    }

    #[test]
    fn places_at_front() {
        let (ordered, nodes) = setup();
        let item = Node::file("0", "0");
        let placement =
            resolve_insertion(&ordered, Some(&Cursor::new("3")), &item, &nodes, &SortSpec::by_name())
                .unwrap();
        assert_eq!(placement, Placement::At(0));
    }

    #[test]
    fn tail_is_ambiguous_while_more_remain() {
        let (ordered, nodes) = setup();
        let item = Node::file("Z", "Z");
        let placement =
            resolve_insertion(&ordered, Some(&Cursor::new("3")), &item, &nodes, &SortSpec::by_name())
                .unwrap();
        assert_eq!(placement, Placement::NotDetermined);
    }

    #[test]
    fn tail_is_determined_when_fully_loaded() {
        let (ordered, nodes) = setup();
        let item = Node::file("Z", "Z");
        let placement =
            resolve_insertion(&ordered, None, &item, &nodes, &SortSpec::by_name()).unwrap();
        assert_eq!(placement, Placement::At(3));
    }

    #[test]
    fn empty_window_resolves_by_cursor() {
        let nodes = NodeTable::default();
        let item = Node::file("x", "x");
        let spec = SortSpec::by_name();
        assert_eq!(
            resolve_insertion(&[], None, &item, &nodes, &spec).unwrap(),
            Placement::At(0)
        );
        assert_eq!(
            resolve_insertion(&[], Some(&Cursor::new("0")), &item, &nodes, &spec).unwrap(),
            Placement::NotDetermined
        );
    }

    #[test]
    fn skips_own_entry() {
        let (ordered, mut nodes) = setup();
        let renamed = Node::file("A", "Bz");
        nodes.upsert(renamed.clone());
        let placement =
            resolve_insertion(&ordered, None, &renamed, &nodes, &SortSpec::by_name()).unwrap();
        assert_eq!(placement, Placement::At(1));
    }

    #[test]
    fn unknown_loaded_node_is_an_error() {
        let ordered = vec![NodeId::from("ghost")];
        let err = resolve_insertion(
            &ordered,
            None,
            &Node::file("x", "x"),
            &NodeTable::default(),
            &SortSpec::by_name(),
        )
        .unwrap_err();
        assert!(matches!(err, ListingError::UnknownNode(id) if id.as_str() == "ghost"));
    }
}
