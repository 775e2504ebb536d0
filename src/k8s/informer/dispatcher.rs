use super::errors::handler_panic_error;
use super::handler::ResourceEventHandler;
use super::normalizer::Transition;
use super::stats::{record, SharedStats};
use super::store::ResourceStore;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error};

/// Applies transitions to the store and hands them to the handler, one at a time
pub struct Dispatcher<H> {
    store: ResourceStore,
    handler: H,
    stats: SharedStats,
}

impl<H: ResourceEventHandler> Dispatcher<H> {
    #[must_use]
    pub fn new(handler: H, stats: SharedStats) -> Self {
        Self {
            store: ResourceStore::new(),
            handler,
            stats,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &ResourceStore {
        &self.store
    }

    /// Apply `transition` to the store, then run the handler to completion.
    ///
    /// Handler errors and panics are logged and counted; they never propagate.
    pub async fn dispatch(&mut self, transition: Transition) {
        debug!("⚡ {} {}", transition.kind_name(), transition.id());
        let outcome = match transition {
            Transition::Added(new) => {
                self.store.put(new.clone());
                record(&self.stats, |s| s.added += 1);
                AssertUnwindSafe(self.handler.on_transition(None, Some(&new)))
                    .catch_unwind()
                    .await
            }
            Transition::Updated { old, new } => {
                self.store.put(new.clone());
                record(&self.stats, |s| s.updated += 1);
                AssertUnwindSafe(self.handler.on_transition(Some(&old), Some(&new)))
                    .catch_unwind()
                    .await
            }
            Transition::Deleted { id, last_known } => {
                self.store.remove(&id);
                record(&self.stats, |s| {
                    s.deleted += 1;
                    if last_known.is_none() {
                        s.deleted_unknown += 1;
                    }
                });
                AssertUnwindSafe(self.handler.on_transition(last_known.as_ref(), None))
                    .catch_unwind()
                    .await
            }
        };

        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(payload) => handler_panic_error(payload.as_ref()),
        };
        error!("❌ Handler failed: {}", failure);
        record(&self.stats, |s| s.handler_failures += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::k8s::informer::handler::handler_fn;
    use crate::k8s::informer::resource::{ResourceIdentity, ResourceState};
    use crate::k8s::informer::stats::snapshot;
    use k8s_openapi::api::core::v1::Pod;
    use kube::core::{ApiResource, DynamicObject};
    use std::sync::{Arc, Mutex, RwLock};

    fn state(name: &str, version: &str) -> ResourceState {
        let ar = ApiResource::erase::<Pod>(&());
        let mut obj = DynamicObject::new(name, &ar).within("default");
        obj.metadata.resource_version = Some(version.to_string());
        ResourceState::from_object("Pod", obj).unwrap()
    }

    fn label(state: Option<&ResourceState>) -> Option<String> {
        state.map(|s| format!("{}@{}", s.id().name, s.resource_version().unwrap_or("?")))
    }

    #[tokio::test]
    async fn test_dispatch_updates_store_and_calls_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = handler_fn(move |old, new| -> Result<()> {
            sink.lock().unwrap().push((label(old), label(new)));
            Ok(())
        });
        let stats = Arc::new(RwLock::new(Default::default()));
        let mut dispatcher = Dispatcher::new(handler, stats.clone());

        dispatcher.dispatch(Transition::Added(state("a", "1"))).await;
        dispatcher
            .dispatch(Transition::Updated { old: state("a", "1"), new: state("a", "2") })
            .await;
        let id = ResourceIdentity::new("Pod", Some("default"), "a");
        assert_eq!(dispatcher.store().get(&id).and_then(ResourceState::resource_version), Some("2"));

        dispatcher
            .dispatch(Transition::Deleted { id: id.clone(), last_known: Some(state("a", "2")) })
            .await;
        assert!(dispatcher.store().get(&id).is_none());

        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (None, Some("a@1".to_string())),
                (Some("a@1".to_string()), Some("a@2".to_string())),
                (Some("a@2".to_string()), None),
            ]
        );
        let stats = snapshot(&stats);
        assert_eq!((stats.added, stats.updated, stats.deleted), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_handler_failures_are_isolated() {
        let calls = Arc::new(Mutex::new(0u32));
        let counter = calls.clone();
        let handler = handler_fn(move |_old, new| -> Result<()> {
            *counter.lock().unwrap() += 1;
            match new.map(|s| s.id().name.as_str()) {
                Some("boom") => panic!("handler exploded"),
                Some("bad") => Err(Error::Custom("rejected".to_string())),
                _ => Ok(()),
            }
        });
        let stats = Arc::new(RwLock::new(Default::default()));
        let mut dispatcher = Dispatcher::new(handler, stats.clone());

        dispatcher.dispatch(Transition::Added(state("boom", "1"))).await;
        dispatcher.dispatch(Transition::Added(state("bad", "1"))).await;
        dispatcher.dispatch(Transition::Added(state("fine", "1"))).await;

        assert_eq!(*calls.lock().unwrap(), 3);
        assert_eq!(dispatcher.store().len(), 3);
        assert_eq!(snapshot(&stats).handler_failures, 2);
    }

    #[tokio::test]
    async fn test_unknown_deletion_is_counted() {
        let handler = handler_fn(|old, new| -> Result<()> {
            assert!(old.is_none() && new.is_none());
            Ok(())
        });
        let stats = Arc::new(RwLock::new(Default::default()));
        let mut dispatcher = Dispatcher::new(handler, stats.clone());
        let id = ResourceIdentity::new("Pod", Some("default"), "c");
        dispatcher.dispatch(Transition::Deleted { id, last_known: None }).await;

        let stats = snapshot(&stats);
        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.deleted_unknown, 1);
        assert_eq!(stats.handler_failures, 0);
    }
}
