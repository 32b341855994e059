//! Keyed container storage.

use std::collections::BTreeMap;

/// Map from prefixed predicate key to the one container for that key.
///
/// Iteration is in key order, which keeps the order of remote calls stable.
#[derive(Debug)]
pub struct ContainerRegistry<C> {
    slots: BTreeMap<String, C>,
}

impl<C> Default for ContainerRegistry<C> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<C> ContainerRegistry<C> {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the container for `key`, creating it on first access.
    pub fn get_or_insert_with(&mut self, key: &str, create: impl FnOnce() -> C) -> &mut C {
        self.slots.entry(key.to_string()).or_insert_with(create)
    }

    pub fn get(&self, key: &str) -> Option<&C> {
        self.slots.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut C> {
        self.slots.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Drops the container for `key`, returning it.
    pub fn remove(&mut self, key: &str) -> Option<C> {
        self.slots.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &C)> {
        self.slots.iter().map(|(k, c)| (k.as_str(), c))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut C)> {
        self.slots.iter_mut().map(|(k, c)| (k.as_str(), c))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut C> {
        self.slots.values_mut()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
