use super::resource::{Cursor, ResourceIdentity, ResourceState, Selectors};
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Full snapshot of a collection plus the cursor to watch from
#[derive(Debug, Clone)]
pub struct Listing {
    pub items: Vec<ResourceState>,
    pub cursor: Cursor,
}

/// Body of a deletion reported by a watch stream
#[derive(Debug, Clone)]
pub enum DeletedObject {
    /// The stream carried the deleted object's final state.
    ///
    /// The final body only becomes the transition's old state when nothing is
    /// cached for the identity. A cached state wins, so handlers always see the
    /// same state as `old` that they last received as `new`.
    Known(ResourceState),
    /// Placeholder: the deletion was observed out of sequence and the final
    /// state is unknown. `last_known` may hold an earlier, possibly stale body.
    FinalStateUnknown {
        id: ResourceIdentity,
        last_known: Option<ResourceState>,
    },
}

impl DeletedObject {
    #[must_use]
    pub const fn id(&self) -> &ResourceIdentity {
        match self {
            Self::Known(state) => state.id(),
            Self::FinalStateUnknown { id, .. } => id,
        }
    }

    /// Whatever body the stream supplied, full or stale
    #[must_use]
    pub fn into_body(self) -> Option<ResourceState> {
        match self {
            Self::Known(state) => Some(state),
            Self::FinalStateUnknown { last_known, .. } => last_known,
        }
    }
}

/// One event read from a watch stream
#[derive(Debug, Clone)]
pub enum RawEvent {
    Added(ResourceState),
    Modified(ResourceState),
    Deleted(DeletedObject),
    /// Progress marker; only moves the cursor
    Bookmark(Cursor),
    /// The server can no longer resume from the cursor; a re-list is required
    Expired,
    /// An event the source could not interpret; dropped with a diagnostic
    Unrecognized(String),
}

impl RawEvent {
    /// Cursor to resume from after this event, when the event carries one
    #[must_use]
    pub fn cursor(&self) -> Option<Cursor> {
        match self {
            Self::Added(state) | Self::Modified(state) | Self::Deleted(DeletedObject::Known(state)) => {
                state.cursor()
            }
            Self::Bookmark(cursor) => Some(cursor.clone()),
            Self::Deleted(DeletedObject::FinalStateUnknown { .. }) | Self::Expired | Self::Unrecognized(_) => {
                None
            }
        }
    }

    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Added(_) => "Added",
            Self::Modified(_) => "Modified",
            Self::Deleted(_) => "Deleted",
            Self::Bookmark(_) => "Bookmark",
            Self::Expired => "Expired",
            Self::Unrecognized(_) => "Unrecognized",
        }
    }
}

pub type WatchStream = BoxStream<'static, Result<RawEvent>>;

/// Remote collection that can be listed and then watched from a cursor.
///
/// A stream that ends or yields an error is finished; the session decides
/// whether to resume or re-list.
#[async_trait]
pub trait ListerWatcher: Send + Sync {
    /// Collection kind recorded in every identity this source produces
    fn kind(&self) -> &str;

    async fn list(&self, selectors: &Selectors) -> Result<Listing>;

    async fn watch(&self, selectors: &Selectors, cursor: &Cursor) -> Result<WatchStream>;
}
