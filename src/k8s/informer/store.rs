use super::resource::{ResourceIdentity, ResourceState};
use std::collections::HashMap;

/// Last known state of every resource the informer believes exists.
///
/// Owned by a single dispatcher lane, so it carries no lock. Only the
/// dispatcher mutates it, one transition at a time.
#[derive(Debug, Default)]
pub struct ResourceStore {
    entries: HashMap<ResourceIdentity, ResourceState>,
}

impl ResourceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &ResourceIdentity) -> Option<&ResourceState> {
        self.entries.get(id)
    }

    pub fn put(&mut self, state: ResourceState) -> Option<ResourceState> {
        self.entries.insert(state.id().clone(), state)
    }

    pub fn remove(&mut self, id: &ResourceIdentity) -> Option<ResourceState> {
        self.entries.remove(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ResourceIdentity) -> bool {
        self.entries.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn identities(&self) -> impl Iterator<Item = &ResourceIdentity> {
        self.entries.keys()
    }

    pub fn states(&self) -> impl Iterator<Item = &ResourceState> {
        self.entries.values()
    }
}
