use std::collections::BTreeMap;
use crate::error::PhysicsError;
use crate::Result;

/// Ordered registry of engine objects keyed by handle.
///
/// Handles are allocated monotonically, so iteration follows registration
/// order and stepping stays deterministic for a given sequence of calls.
#[derive(Debug)]
pub struct Storage<H: Ord + Copy + std::fmt::Debug, T> {
    items: BTreeMap<H, T>,
    kind: &'static str,
}

impl<H: Ord + Copy + std::fmt::Debug, T> Storage<H, T> {
    /// Creates a new empty storage; `kind` names the item type in error messages
    pub fn new(kind: &'static str) -> Self {
        Self {
            items: BTreeMap::new(),
            kind,
        }
    }

    /// Inserts an item, returning false when the handle was already present
    pub fn insert(&mut self, handle: H, item: T) -> bool {
        if self.items.contains_key(&handle) {
            return false;
        }
        self.items.insert(handle, item);
        true
    }

    /// Gets a reference to an item by its handle
    pub fn get(&self, handle: H) -> Option<&T> {
        self.items.get(&handle)
    }

    /// Gets a mutable reference to an item by its handle
    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        self.items.get_mut(&handle)
    }

    /// Removes an item, returning an error if the handle is unknown
    pub fn remove(&mut self, handle: H) -> Result<T> {
        self.items.remove(&handle).ok_or_else(|| {
            PhysicsError::ResourceNotFound(format!("{} with handle {:?} not found", self.kind, handle))
        })
    }

    /// Returns whether the handle is registered
    pub fn contains(&self, handle: H) -> bool {
        self.items.contains_key(&handle)
    }

    /// Returns the number of items in the storage
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether the storage is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Clears all items from the storage
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Returns all handles in registration order
    pub fn handles(&self) -> Vec<H> {
        self.items.keys().copied().collect()
    }

    /// Returns an iterator over all items
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.items.iter().map(|(h, item)| (*h, item))
    }

    /// Returns an iterator over the stored values
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_unknown_handle_is_an_error() {
        let mut storage: Storage<u64, &str> = Storage::new("Body");
        assert!(storage.insert(1, "a"));
        assert!(!storage.insert(1, "b"));
        assert_eq!(storage.len(), 1);
        assert!(storage.remove(1).is_ok());
        assert!(matches!(storage.remove(1), Err(PhysicsError::ResourceNotFound(_))));
    }
}
