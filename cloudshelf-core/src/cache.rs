use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, error};

use crate::error::ListingError;
use crate::events::MutationEvent;
use crate::key::{CollectionKey, ListKey};
use crate::merge::{MergeOutcome, Page, PageKind, merge_first_page, merge_next_page};
use crate::node::{Node, NodeId, NodeTable};
use crate::observer::ListingObserver;
use crate::projector::{Listing, read};
use crate::updater::{Repositioned, Update, WindowChange, apply_change};
use crate::window::{Cursor, ListWindow};

/// All open listings of a client plus the node records they reference.
///
/// Windows are replaced wholesale; a snapshot obtained from [`window`]
/// never changes underneath its holder.
///
/// [`window`]: ListingCache::window
#[derive(Default)]
pub struct ListingCache {
    windows: HashMap<ListKey, Arc<ListWindow>>,
    nodes: NodeTable,
    observers: Vec<Arc<dyn ListingObserver>>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: Arc<dyn ListingObserver>) {
        self.observers.push(observer);
    }

    /// Returns the window for `key`, creating an empty one on first use.
    pub fn open(&mut self, key: &ListKey) -> Arc<ListWindow> {
        Arc::clone(
            self.windows
                .entry(key.clone())
                .or_insert_with(|| Arc::new(ListWindow::empty())),
        )
    }

    /// Replaces the window for `key` with an empty one.
    pub fn reset(&mut self, key: &ListKey) {
        debug!(?key, "listing reset");
        self.windows.insert(key.clone(), Arc::new(ListWindow::empty()));
    }

    /// Drops the window and every node no other window references.
    pub fn close(&mut self, key: &ListKey) -> bool {
        let closed = self.windows.remove(key).is_some();
        if closed {
            self.collect_garbage();
        }
        closed
    }

    pub fn window(&self, key: &ListKey) -> Option<Arc<ListWindow>> {
        self.windows.get(key).cloned()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ListKey> {
        self.windows.keys()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    pub fn read(&self, key: &ListKey) -> Result<Option<Listing>, ListingError> {
        self.windows
            .get(key)
            .map(|window| read(window, &self.nodes))
            .transpose()
    }

    /// Merges a fetched page into the window for `key`.
    ///
    /// The caller guarantees the page answers the request currently active
    /// for `key`.
    pub fn merge_page(
        &mut self,
        key: &ListKey,
        kind: PageKind,
        page: Page,
    ) -> Result<Vec<NodeId>, ListingError> {
        let ids = page.ids();
        let replaced = matches!(kind, PageKind::First).then_some(key);
        for node in page.items {
            self.store_node(replaced, node)?;
        }
        let current = self.open(key);
        let outcome = match kind {
            PageKind::First => MergeOutcome {
                window: merge_first_page(&ids, page.cursor),
                resolved: Vec::new(),
            },
            PageKind::Next => merge_next_page(&current, &ids, page.cursor, &self.nodes, &key.sort)?,
        };
        debug!(
            ?key,
            ?kind,
            received = ids.len(),
            ordered = outcome.window.ordered().len(),
            unordered = outcome.window.unordered().len(),
            has_more = outcome.window.has_more(),
            "page merged"
        );
        self.swap(key, outcome.window);
        if let Some(window) = self.windows.get(key) {
            for observer in &self.observers {
                observer.on_page_merged(key, window);
            }
        }
        Ok(outcome.resolved.into_iter().map(|(id, _)| id).collect())
    }

    /// Applies one mutation notification to every affected window.
    ///
    /// Returns the structural moves that happened, per window.
    pub fn apply(
        &mut self,
        event: &MutationEvent,
    ) -> Result<Vec<(ListKey, Repositioned)>, ListingError> {
        match event {
            MutationEvent::Created { node, collections }
            | MutationEvent::Updated { node, collections } => {
                self.apply_upsert(node, collections)
            }
            MutationEvent::Removed { id, collections } => Ok(self.apply_remove(id, collections)),
        }
    }

    /// Overwrites the continuation token of an open window.
    pub fn replace_cursor(&mut self, key: &ListKey, cursor: Option<Cursor>) -> bool {
        let Some(window) = self.windows.get(key) else {
            return false;
        };
        let next = window.with_cursor(cursor);
        self.swap(key, next);
        true
    }

    fn apply_upsert(
        &mut self,
        node: &Node,
        collections: &[CollectionKey],
    ) -> Result<Vec<(ListKey, Repositioned)>, ListingError> {
        let mut evicted = Vec::new();
        let targets: Vec<(ListKey, Arc<ListWindow>)> = self
            .windows
            .iter()
            .filter_map(|(key, window)| {
                let tracked = window.contains(&node.id);
                if key.collection.rules_out(node) {
                    if tracked {
                        evicted.push((key.clone(), Arc::clone(window)));
                    }
                    return None;
                }
                (tracked || collections.contains(&key.collection))
                    .then(|| (key.clone(), Arc::clone(window)))
            })
            .collect();

        let mut moves = Vec::new();
        for (key, window) in evicted {
            if let Some(update) = crate::updater::remove(&window, &node.id) {
                moves.push(self.commit(key, update));
            }
        }
        if targets.is_empty() {
            self.forget_unreferenced(&node.id);
            return Ok(moves);
        }

        let previous = self.nodes.upsert(node.clone());
        for (key, window) in targets {
            let change = WindowChange::Upsert {
                previous: previous.as_ref(),
                node,
            };
            if let Some(update) = apply_change(&window, change, &self.nodes, &key.sort)? {
                moves.push(self.commit(key, update));
            }
        }
        Ok(moves)
    }

    fn apply_remove(
        &mut self,
        id: &NodeId,
        collections: &[CollectionKey],
    ) -> Vec<(ListKey, Repositioned)> {
        let everywhere = collections.is_empty();
        let targets: Vec<(ListKey, Arc<ListWindow>)> = self
            .windows
            .iter()
            .filter(|(key, _)| everywhere || collections.contains(&key.collection))
            .map(|(key, window)| (key.clone(), Arc::clone(window)))
            .collect();

        let mut moves = Vec::new();
        for (key, window) in targets {
            if let Some(update) = crate::updater::remove(&window, id) {
                moves.push(self.commit(key, update));
            }
        }
        if everywhere {
            self.nodes.remove(id);
        } else {
            self.forget_unreferenced(id);
        }
        moves
    }

    /// Drops the record of `id` once no window tracks it.
    fn forget_unreferenced(&mut self, id: &NodeId) {
        if !self.windows.values().any(|window| window.contains(id)) {
            self.nodes.remove(id);
        }
    }

    /// Upserts a record delivered by a page and re-sorts the windows that
    /// track it if the new record moves it. `skip` is a window about to be
    /// replaced.
    fn store_node(&mut self, skip: Option<&ListKey>, node: Node) -> Result<(), ListingError> {
        let Some(previous) = self.nodes.upsert(node.clone()) else {
            return Ok(());
        };
        if previous == node {
            return Ok(());
        }
        let targets: Vec<(ListKey, Arc<ListWindow>)> = self
            .windows
            .iter()
            .filter(|(key, window)| Some(*key) != skip && window.contains(&node.id))
            .map(|(key, window)| (key.clone(), Arc::clone(window)))
            .collect();
        for (key, window) in targets {
            let change = WindowChange::Upsert {
                previous: Some(&previous),
                node: &node,
            };
            if let Some(update) = apply_change(&window, change, &self.nodes, &key.sort)? {
                self.commit(key, update);
            }
        }
        Ok(())
    }

    fn commit(&mut self, key: ListKey, update: Update) -> (ListKey, Repositioned) {
        debug!(
            ?key,
            id = %update.moved.id,
            from = ?update.moved.from,
            to = ?update.moved.to,
            "listing item repositioned"
        );
        self.swap(&key, update.window);
        for observer in &self.observers {
            observer.on_item_repositioned(&key, &update.moved);
        }
        (key, update.moved)
    }

    fn swap(&mut self, key: &ListKey, window: ListWindow) {
        if let Err(violation) = window.check_invariants(&self.nodes, &key.sort) {
            if cfg!(debug_assertions) {
                panic!("listing {key:?} violates an invariant: {violation}");
            }
            error!(?key, %violation, "listing invariant violated");
        }
        self.windows.insert(key.clone(), Arc::new(window));
    }

    fn collect_garbage(&mut self) {
        let referenced: HashSet<&NodeId> = self
            .windows
            .values()
            .flat_map(|window| window.ordered().iter().chain(window.unordered()))
            .collect();
        self.nodes.retain_referenced(&referenced);
    }
}
