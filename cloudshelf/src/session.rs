use std::sync::Arc;

use cloudshelf_core::{
    CollectionKey, Cursor, ListKey, ListWindow, Listing, ListingCache, ListingError,
    ListingObserver, MutationEvent, Node, NodeId, Page, PageKind, Position, Repositioned,
    SortSpec, Store,
};
use thiserror::Error;
use tracing::debug;

use crate::mutations::{self, DiskMutations, MutationError};
use crate::retry::RetryPolicy;
use crate::source::{PageSource, SourceError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    #[error("listing error: {0}")]
    Listing(#[from] ListingError),
    #[error("mutation error: {0}")]
    Mutation(#[from] MutationError),
    #[error("no listing is open")]
    NoActiveView,
    #[error("session was built without remote mutation access")]
    ReadOnly,
}

/// Identifies the request a fetched page answers.
///
/// A ticket goes stale once another listing is opened or the same one is
/// reopened; pages delivered for stale tickets are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: ListKey,
    pub kind: PageKind,
    generation: u64,
    shift: i64,
}

/// One user's view onto the remote store: a single active listing fed by a
/// [`PageSource`] plus the local mutations routed into it.
pub struct BrowseSession<S> {
    source: S,
    mutations: Option<DiskMutations>,
    cache: ListingCache,
    view: Store<Option<ListKey>>,
    generation: u64,
    /// Net cursor adjustment of the active window since it was opened.
    shift: i64,
    page_size: u32,
    retry: RetryPolicy,
}

impl<S: PageSource> BrowseSession<S> {
    pub fn new(source: S, page_size: u32) -> Self {
        Self {
            source,
            mutations: None,
            cache: ListingCache::new(),
            view: Store::create(None),
            generation: 0,
            shift: 0,
            page_size: page_size.max(1),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_mutations(mut self, mutations: DiskMutations) -> Self {
        self.mutations = Some(mutations);
        self
    }

    pub fn add_observer(&mut self, observer: Arc<dyn ListingObserver>) {
        self.cache.add_observer(observer);
    }

    /// The key of the active listing; subscribers learn about switches.
    pub fn view(&self) -> Store<Option<ListKey>> {
        self.view.clone()
    }

    pub fn active(&self) -> Option<ListKey> {
        self.view.get()
    }

    pub fn cache(&self) -> &ListingCache {
        &self.cache
    }

    pub fn window(&self) -> Option<Arc<ListWindow>> {
        self.active().and_then(|key| self.cache.window(&key))
    }

    pub fn read(&self) -> Result<Option<Listing>, SessionError> {
        match self.active() {
            Some(key) => Ok(self.cache.read(&key)?),
            None => Ok(None),
        }
    }

    /// Makes `collection` under `sort` the active listing and returns the
    /// ticket for its first page. The previous listing is closed.
    pub fn begin_open(&mut self, collection: CollectionKey, sort: SortSpec) -> FetchTicket {
        let key = ListKey::new(collection, sort);
        if let Some(previous) = self.active()
            && previous != key
        {
            self.cache.close(&previous);
        }
        self.cache.open(&key);
        self.generation += 1;
        self.shift = 0;
        self.view.set(Some(key.clone()));
        FetchTicket {
            key,
            kind: PageKind::First,
            generation: self.generation,
            shift: 0,
        }
    }

    /// Ticket and cursor for the next page of the active listing, if the
    /// first page arrived and the listing is not exhausted.
    pub fn begin_load_more(&self) -> Option<(FetchTicket, Cursor)> {
        let key = self.active()?;
        let window = self.cache.window(&key)?;
        if !window.is_loaded() {
            return None;
        }
        let cursor = window.cursor()?.clone();
        Some((
            FetchTicket {
                key,
                kind: PageKind::Next,
                generation: self.generation,
                shift: self.shift,
            },
            cursor,
        ))
    }

    /// Merges a page fetched for `ticket`. Returns `false` when the ticket
    /// went stale and the page was dropped.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        mut page: Page,
    ) -> Result<bool, SessionError> {
        if self.active().as_ref() != Some(&ticket.key) || ticket.generation != self.generation {
            debug!(key = ?ticket.key, kind = ?ticket.kind, "discarding stale page");
            return Ok(false);
        }
        let drift = self.shift - ticket.shift;
        if drift != 0
            && let Some(cursor) = &page.cursor
            && let Some(shifted) = self.source.shift_cursor(cursor, drift)
        {
            page.cursor = Some(shifted);
        }
        self.cache.merge_page(&ticket.key, ticket.kind, page)?;
        Ok(true)
    }

    pub async fn open(
        &mut self,
        collection: CollectionKey,
        sort: SortSpec,
    ) -> Result<Listing, SessionError> {
        let ticket = self.begin_open(collection, sort);
        let page = self.fetch(&ticket, None).await?;
        self.complete_fetch(ticket, page)?;
        self.read()?.ok_or(SessionError::NoActiveView)
    }

    /// Fetches and merges the next page. Returns `false` when there was
    /// nothing to load.
    pub async fn load_more(&mut self) -> Result<bool, SessionError> {
        let Some((ticket, cursor)) = self.begin_load_more() else {
            return Ok(false);
        };
        let page = self.fetch(&ticket, Some(&cursor)).await?;
        self.complete_fetch(ticket, page)
    }

    pub async fn load_all(&mut self) -> Result<Listing, SessionError> {
        while self.load_more().await? {}
        self.read()?.ok_or(SessionError::NoActiveView)
    }

    /// Routes a mutation notification into every affected listing.
    ///
    /// Open search listings whose filter matches a created or updated node
    /// are added to the event's collections; the cache drops the node from
    /// search listings whose filter no longer matches.
    pub fn apply(
        &mut self,
        event: MutationEvent,
    ) -> Result<Vec<(ListKey, Repositioned)>, SessionError> {
        let event = self.route_searches(event);
        let moves = self.cache.apply(&event)?;
        for (key, moved) in &moves {
            self.shift_cursor(key, moved);
        }
        Ok(moves)
    }

    pub async fn create_folder(
        &mut self,
        parent: &str,
        name: &str,
    ) -> Result<Vec<(ListKey, Repositioned)>, SessionError> {
        let events = self.remote()?.create_folder(parent, name).await?;
        self.apply_all(events)
    }

    pub async fn rename(
        &mut self,
        id: &NodeId,
        new_name: &str,
    ) -> Result<Vec<(ListKey, Repositioned)>, SessionError> {
        let node = self.known(id)?;
        let events = self.remote()?.rename(&node, new_name).await?;
        self.apply_all(events)
    }

    pub async fn move_to(
        &mut self,
        id: &NodeId,
        folder: &str,
    ) -> Result<Vec<(ListKey, Repositioned)>, SessionError> {
        let node = self.known(id)?;
        let events = self.remote()?.move_to(&node, folder).await?;
        self.apply_all(events)
    }

    pub async fn trash(
        &mut self,
        id: &NodeId,
    ) -> Result<Vec<(ListKey, Repositioned)>, SessionError> {
        let node = self.known(id)?;
        let events = self.remote()?.trash(&node).await?;
        self.apply_all(events)
    }

    pub async fn restore(
        &mut self,
        id: &NodeId,
    ) -> Result<Vec<(ListKey, Repositioned)>, SessionError> {
        let node = self.known(id)?;
        let events = self.remote()?.restore(&node).await?;
        self.apply_all(events)
    }

    pub async fn delete_permanently(
        &mut self,
        id: &NodeId,
    ) -> Result<Vec<(ListKey, Repositioned)>, SessionError> {
        let node = self.known(id)?;
        let events = self.remote()?.delete_permanently(&node).await?;
        self.apply_all(events)
    }

    /// Announces a node whose upload finished outside this session.
    pub fn upload_completed(
        &mut self,
        node: Node,
    ) -> Result<Vec<(ListKey, Repositioned)>, SessionError> {
        self.apply_all(mutations::upload_completed(node))
    }

    async fn fetch(&self, ticket: &FetchTicket, cursor: Option<&Cursor>) -> Result<Page, SourceError> {
        let source = &self.source;
        let key = &ticket.key;
        let page_size = self.page_size;
        match cursor {
            None => {
                self.retry
                    .run("first page", || {
                        source.fetch_first_page(&key.collection, &key.sort, page_size)
                    })
                    .await
            }
            Some(cursor) => {
                self.retry
                    .run("next page", || {
                        source.fetch_next_page(&key.collection, &key.sort, cursor, page_size)
                    })
                    .await
            }
        }
    }

    fn apply_all(
        &mut self,
        events: Vec<MutationEvent>,
    ) -> Result<Vec<(ListKey, Repositioned)>, SessionError> {
        let mut moves = Vec::new();
        for event in events {
            moves.extend(self.apply(event)?);
        }
        Ok(moves)
    }

    fn route_searches(&self, event: MutationEvent) -> MutationEvent {
        match event {
            MutationEvent::Created {
                node,
                mut collections,
            } => {
                self.extend_searches(&node, &mut collections);
                MutationEvent::Created { node, collections }
            }
            MutationEvent::Updated {
                node,
                mut collections,
            } => {
                self.extend_searches(&node, &mut collections);
                MutationEvent::Updated { node, collections }
            }
            removed @ MutationEvent::Removed { .. } => removed,
        }
    }

    fn extend_searches(&self, node: &Node, collections: &mut Vec<CollectionKey>) {
        // trashed nodes never show up in search results
        if collections.contains(&CollectionKey::Trash) {
            return;
        }
        let matching: Vec<CollectionKey> = self
            .cache
            .keys()
            .map(|key| &key.collection)
            .filter(|collection| matches!(collection, CollectionKey::Search(_)))
            .filter(|collection| !collection.rules_out(node))
            .cloned()
            .collect();
        for collection in matching {
            if !collections.contains(&collection) {
                collections.push(collection);
            }
        }
    }

    /// Keeps an offset cursor pointing at the first unfetched remote item
    /// after a node entered or left the ordered prefix.
    fn shift_cursor(&mut self, key: &ListKey, moved: &Repositioned) {
        let was_ordered = matches!(moved.from, Some(Position::Ordered(_)));
        let is_ordered = matches!(moved.to, Some(Position::Ordered(_)));
        let delta = match (was_ordered, is_ordered) {
            (false, true) => 1,
            (true, false) => -1,
            _ => return,
        };
        let Some(window) = self.cache.window(key) else {
            return;
        };
        let Some(cursor) = window.cursor() else {
            return;
        };
        let Some(shifted) = self.source.shift_cursor(cursor, delta) else {
            return;
        };
        debug!(?key, from = %cursor, to = %shifted, "cursor shifted");
        self.cache.replace_cursor(key, Some(shifted));
        if self.active().as_ref() == Some(key) {
            self.shift += delta;
        }
    }

    fn known(&self, id: &NodeId) -> Result<Node, SessionError> {
        self.cache
            .node(id)
            .cloned()
            .ok_or_else(|| ListingError::UnknownNode(id.clone()).into())
    }

    fn remote(&self) -> Result<&DiskMutations, SessionError> {
        self.mutations.as_ref().ok_or(SessionError::ReadOnly)
    }
}
