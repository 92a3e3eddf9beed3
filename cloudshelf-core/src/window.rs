use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InvariantViolation;
use crate::node::{NodeId, NodeTable};
use crate::sort::{SortSpec, compare};

/// Opaque continuation token of a sorted remote collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a node sits inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Ordered(usize),
    Unordered,
}

/// Locally held part of one sorted remote collection.
///
/// `ordered` is a sort-correct prefix of the remote collection. `unordered`
/// holds members whose place relative to the unfetched tail is unknown; it
/// is a set kept in insertion order so reads are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListWindow {
    pub(crate) ordered: Vec<NodeId>,
    pub(crate) cursor: Option<Cursor>,
    pub(crate) unordered: Vec<NodeId>,
    pub(crate) loaded: bool,
}

impl ListWindow {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ordered(&self) -> &[NodeId] {
        &self.ordered
    }

    pub fn unordered(&self) -> &[NodeId] {
        &self.unordered
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    /// Whether a first page has been merged since the window was created or reset.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.ordered.len() + self.unordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty() && self.unordered.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.position_of(id).is_some()
    }

    pub fn position_of(&self, id: &NodeId) -> Option<Position> {
        if let Some(index) = self.ordered.iter().position(|entry| entry == id) {
            return Some(Position::Ordered(index));
        }
        self.unordered.contains(id).then_some(Position::Unordered)
    }

    /// Replaces the continuation token, keeping both tiers.
    pub fn with_cursor(&self, cursor: Option<Cursor>) -> Self {
        Self {
            cursor,
            ..self.clone()
        }
    }

    pub(crate) fn detach(&mut self, id: &NodeId) -> Option<Position> {
        if let Some(index) = self.ordered.iter().position(|entry| entry == id) {
            self.ordered.remove(index);
            return Some(Position::Ordered(index));
        }
        let index = self.unordered.iter().position(|entry| entry == id)?;
        self.unordered.remove(index);
        Some(Position::Unordered)
    }

    /// Checks tier uniqueness, tier disjointness and the order of `ordered`.
    pub fn check_invariants(
        &self,
        nodes: &NodeTable,
        spec: &SortSpec,
    ) -> Result<(), InvariantViolation> {
        let mut seen = HashSet::with_capacity(self.ordered.len());
        for id in &self.ordered {
            if !seen.insert(id) {
                return Err(InvariantViolation::DuplicateOrdered(id.clone()));
            }
        }
        let mut pending = HashSet::with_capacity(self.unordered.len());
        for id in &self.unordered {
            if seen.contains(id) {
                return Err(InvariantViolation::BothTiers(id.clone()));
            }
            if !pending.insert(id) {
                return Err(InvariantViolation::DuplicateUnordered(id.clone()));
            }
        }
        for pair in self.ordered.windows(2) {
            let before = nodes
                .get(&pair[0])
                .ok_or_else(|| InvariantViolation::MissingRecord(pair[0].clone()))?;
            let after = nodes
                .get(&pair[1])
                .ok_or_else(|| InvariantViolation::MissingRecord(pair[1].clone()))?;
            if compare(before, after, spec) == Ordering::Greater {
                return Err(InvariantViolation::OutOfOrder {
                    before: pair[0].clone(),
                    after: pair[1].clone(),
                });
            }
        }
        Ok(())
    }
}
