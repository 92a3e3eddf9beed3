pub mod cache;
mod error;
pub mod events;
pub mod key;
pub mod merge;
pub mod node;
pub mod observer;
pub mod projector;
pub mod resolver;
pub mod sort;
pub mod store;
pub mod updater;
pub mod window;

pub use cache::ListingCache;
pub use error::{InvariantViolation, ListingError};
pub use events::MutationEvent;
pub use key::{CollectionKey, ListKey, SearchFilter};
pub use merge::{MergeOutcome, Page, PageKind, merge_first_page, merge_next_page};
pub use node::{Node, NodeId, NodeKind, NodeTable};
pub use observer::ListingObserver;
pub use projector::{Listing, project, read};
pub use resolver::{Placement, resolve_insertion};
pub use sort::{SortDirection, SortField, SortParseError, SortSpec, compare};
pub use store::{Store, SubscriptionId};
pub use updater::{Repositioned, Update, WindowChange, apply_change};
pub use window::{Cursor, ListWindow, Position};
