/**
 * Event normalization
 *
 * Turns raw stream events into canonical transitions by comparing them with
 * the store. Added fires at most once per lifetime of a resource, and a
 * deletion is always reported even when no body survived.
 */
use super::resource::{ResourceIdentity, ResourceState};
use super::source::RawEvent;
use super::store::ResourceStore;
use itertools::Itertools;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Canonical change to one resource
#[derive(Debug, Clone)]
pub enum Transition {
    Added(ResourceState),
    Updated {
        old: ResourceState,
        new: ResourceState,
    },
    /// `last_known` is `None` when the deletion arrived as a placeholder and
    /// nothing about the resource was cached
    Deleted {
        id: ResourceIdentity,
        last_known: Option<ResourceState>,
    },
}

impl Transition {
    #[must_use]
    pub const fn id(&self) -> &ResourceIdentity {
        match self {
            Self::Added(state) | Self::Updated { new: state, .. } => state.id(),
            Self::Deleted { id, .. } => id,
        }
    }

    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Added(_) => "Added",
            Self::Updated { .. } => "Updated",
            Self::Deleted { .. } => "Deleted",
        }
    }
}

/// Normalize one raw event against the current store.
///
/// Returns `None` for events that change nothing: a state whose version is
/// already cached, bookmarks, expiry signals and unrecognized events.
#[must_use]
pub fn normalize(store: &ResourceStore, event: RawEvent) -> Option<Transition> {
    match event {
        RawEvent::Added(new) | RawEvent::Modified(new) => upsert(store, new),
        RawEvent::Deleted(deleted) => {
            let id = deleted.id().clone();
            // Cached state first, then whatever body the stream carried, then nothing.
            let last_known = store.get(&id).cloned().or_else(|| deleted.into_body());
            if last_known.is_none() {
                debug!("🪦 Deletion of {} with no recoverable state", id);
            }
            Some(Transition::Deleted { id, last_known })
        }
        RawEvent::Unrecognized(reason) => {
            warn!("Dropping unrecognized watch event: {}", reason);
            None
        }
        RawEvent::Bookmark(_) | RawEvent::Expired => None,
    }
}

fn upsert(store: &ResourceStore, new: ResourceState) -> Option<Transition> {
    match store.get(new.id()) {
        None => Some(Transition::Added(new)),
        Some(old) if old.same_version(&new) => None,
        Some(old) => Some(Transition::Updated { old: old.clone(), new }),
    }
}

/// Deletions for cached resources missing from a fresh listing, ordered by identity
#[must_use]
pub fn vanished(store: &ResourceStore, listed: &HashSet<ResourceIdentity>) -> Vec<Transition> {
    store
        .states()
        .filter(|state| !listed.contains(state.id()))
        .sorted_by(|a, b| a.id().cmp(b.id()))
        .map(|state| Transition::Deleted {
            id: state.id().clone(),
            last_known: Some(state.clone()),
        })
        .collect()
}
