use crate::key::ListKey;
use crate::updater::Repositioned;
use crate::window::ListWindow;

/// Hooks fired by the listing cache after a window was swapped in.
pub trait ListingObserver: Send + Sync {
    fn on_page_merged(&self, _key: &ListKey, _window: &ListWindow) {}

    fn on_item_repositioned(&self, _key: &ListKey, _moved: &Repositioned) {}
}
