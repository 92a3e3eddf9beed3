use thiserror::Error;

use crate::node::NodeId;

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("node {0} is listed but missing from the node table")]
    UnknownNode(NodeId),
    #[error("listing invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("node {0} appears twice in the ordered tier")]
    DuplicateOrdered(NodeId),
    #[error("node {0} appears twice in the unordered tier")]
    DuplicateUnordered(NodeId),
    #[error("node {0} is held in both tiers")]
    BothTiers(NodeId),
    #[error("ordered tier is out of order: {before} precedes {after}")]
    OutOfOrder { before: NodeId, after: NodeId },
    #[error("node {0} has no record")]
    MissingRecord(NodeId),
}
