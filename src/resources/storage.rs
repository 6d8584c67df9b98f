use parking_lot::{RwLock, RwLockReadGuard};
use slotmap::{Key, SlotMap};
use std::sync::Arc;

// Internal data structure, protected by a lock.
pub struct StorageInner<H: Key, T> {
    pub map: SlotMap<H, Arc<T>>,
}

impl<H: Key, T> Default for StorageInner<H, T> {
    fn default() -> Self {
        Self {
            map: SlotMap::default(),
        }
    }
}

/// Thread-safe slot-map container for shared resources.
///
/// Resources are stored as `Arc<T>`; mutation happens through interior
/// mutability on the resource itself so readers never hold the storage lock
/// across a frame.
pub struct AssetStorage<H: Key, T> {
    inner: RwLock<StorageInner<H, T>>,
}

impl<H: Key, T> Default for AssetStorage<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Key, T> AssetStorage<H, T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::default(),
        }
    }

    /// [Write] Adds a resource and returns a handle.
    pub fn add(&self, asset: impl Into<T>) -> H {
        let mut guard = self.inner.write();
        guard.map.insert(Arc::new(asset.into()))
    }

    /// [Write] Removes a resource. Outstanding `Arc`s stay alive.
    pub fn remove(&self, handle: H) -> Option<Arc<T>> {
        let mut guard = self.inner.write();
        guard.map.remove(handle)
    }

    /// [Read] Gets a single resource.
    pub fn get(&self, handle: H) -> Option<Arc<T>> {
        let guard = self.inner.read();
        guard.map.get(handle).cloned()
    }

    /// [Read] Whether the handle is still live.
    pub fn contains(&self, handle: H) -> bool {
        let guard = self.inner.read();
        guard.map.contains_key(handle)
    }

    /// [Read] Number of stored resources.
    pub fn len(&self) -> usize {
        self.inner.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// [Read - Advanced] Acquires a read-lock guard for batch access.
    pub fn read_lock(&self) -> RwLockReadGuard<'_, StorageInner<H, T>> {
        self.inner.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::new_key_type;

    new_key_type! { struct TestHandle; }

    #[test]
    fn add_and_get() {
        let storage = AssetStorage::<TestHandle, String>::new();
        let handle = storage.add("hello".to_string());
        assert_eq!(&**storage.get(handle).unwrap(), "hello");
    }

    #[test]
    fn remove_keeps_outstanding_arcs() {
        let storage = AssetStorage::<TestHandle, i32>::new();
        let handle = storage.add(7);
        let held = storage.get(handle).unwrap();
        storage.remove(handle);
        assert!(storage.get(handle).is_none());
        assert_eq!(*held, 7);
    }

    #[test]
    fn stale_handle_returns_none() {
        let storage = AssetStorage::<TestHandle, i32>::new();
        let handle = storage.add(1);
        let other = AssetStorage::<TestHandle, i32>::new();
        assert!(other.get(handle).is_none());
    }
}
