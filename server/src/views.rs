use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Per-user view state that outlives a single request.
pub struct ViewStore<V> {
    views: Mutex<HashMap<String, Arc<Mutex<V>>>>,
}

impl<V> Default for ViewStore<V> {
    fn default() -> Self {
        Self {
            views: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Default> ViewStore<V> {
    pub fn get(&self, user_id: &str) -> Arc<Mutex<V>> {
        lock(&self.views)
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }

    pub fn remove(&self, user_id: &str) {
        lock(&self.views).remove(user_id);
    }
}

/// Locks a view mutex. Critical sections never await, so a poisoned lock
/// still holds consistent data.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_user_shares_state() {
        let store: ViewStore<u32> = ViewStore::default();
        *lock(&store.get("u1")) = 5;
        assert_eq!(*lock(&store.get("u1")), 5);
        assert_eq!(*lock(&store.get("u2")), 0);
    }

    #[test]
    fn remove_resets_state() {
        let store: ViewStore<u32> = ViewStore::default();
        *lock(&store.get("u1")) = 5;
        store.remove("u1");
        assert_eq!(*lock(&store.get("u1")), 0);
    }
}
