use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct StoreInner<T> {
    value: T,
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<T>)>,
}

/// Shared observable value.
///
/// Clones point at the same state. Listeners run after every `set` or
/// `update`, outside the lock, so they may read the store again.
pub struct Store<T> {
    inner: Arc<RwLock<StoreInner<T>>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    pub fn create(initial: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                value: initial,
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    pub fn get(&self) -> T {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .clone()
    }

    pub fn set(&self, value: T) {
        self.update(|current| *current = value);
    }

    pub fn update(&self, apply: impl FnOnce(&mut T)) {
        let (snapshot, listeners) = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            apply(&mut inner.value);
            let listeners: Vec<Listener<T>> = inner
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();
            (inner.value.clone(), listeners)
        };
        for listener in listeners {
            listener(&snapshot);
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Returns whether the subscription was still registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = inner.listeners.len();
        inner.listeners.retain(|(entry, _)| *entry != id);
        inner.listeners.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn set_notifies_subscribers_with_new_value() {
        let store = Store::create(1u32);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(move |value| sink.lock().unwrap().push(*value));

        store.set(2);
        store.update(|value| *value += 3);

        assert_eq!(store.get(), 5);
        assert_eq!(*seen.lock().unwrap(), vec![2, 5]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = Store::create(String::new());
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let id = store.subscribe(move |_| *counter.lock().unwrap() += 1);

        store.set("a".to_string());
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set("b".to_string());

        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn stores_are_isolated_but_clones_share_state() {
        let first = Store::create(0);
        let second = Store::create(0);
        let alias = first.clone();
        alias.set(7);
        assert_eq!(first.get(), 7);
        assert_eq!(second.get(), 0);
    }

    #[test]
    fn listener_can_read_store_reentrantly() {
        let store = Store::create(0);
        let reader = store.clone();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        store.subscribe(move |_| *sink.lock().unwrap() = Some(reader.get()));
        store.set(9);
        assert_eq!(*seen.lock().unwrap(), Some(9));
    }
}
