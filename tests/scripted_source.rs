//! Scripted in-memory list/watch source and a recording handler for informer tests
#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kinformer::k8s::informer::{
    handler_fn, Cursor, DeletedObject, ListerWatcher, Listing, RawEvent, ResourceEventHandler,
    ResourceIdentity, ResourceState, Selectors, WatchStream,
};
use kinformer::{Error, Result};
use kube::core::{ApiResource, DynamicObject};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::UnboundedReceiverStream;

pub type Seen = (Option<String>, Option<String>);

pub fn pod(name: &str, version: &str) -> ResourceState {
    let ar = ApiResource::erase::<Pod>(&());
    let mut obj = DynamicObject::new(name, &ar).within("default");
    obj.metadata.resource_version = Some(version.to_string());
    ResourceState::from_object("Pod", obj).unwrap()
}

pub fn pod_id(name: &str) -> ResourceIdentity {
    ResourceIdentity::new("Pod", Some("default"), name)
}

pub fn label(state: Option<&ResourceState>) -> Option<String> {
    state.map(|s| format!("{}@{}", s.id().name, s.resource_version().unwrap_or("?")))
}

pub fn seen(old: Option<&str>, new: Option<&str>) -> Seen {
    (old.map(str::to_string), new.map(str::to_string))
}

/// Sending half of one scripted watch stream
pub struct WatchFeed(mpsc::UnboundedSender<Result<RawEvent>>);

impl WatchFeed {
    fn push(&self, event: Result<RawEvent>) {
        let _ = self.0.send(event);
    }

    pub fn added(&self, state: ResourceState) {
        self.push(Ok(RawEvent::Added(state)));
    }

    pub fn modified(&self, state: ResourceState) {
        self.push(Ok(RawEvent::Modified(state)));
    }

    pub fn deleted(&self, state: ResourceState) {
        self.push(Ok(RawEvent::Deleted(DeletedObject::Known(state))));
    }

    pub fn placeholder(&self, id: ResourceIdentity, last_known: Option<ResourceState>) {
        self.push(Ok(RawEvent::Deleted(DeletedObject::FinalStateUnknown { id, last_known })));
    }

    pub fn bookmark(&self, cursor: &str) {
        self.push(Ok(RawEvent::Bookmark(Cursor::new(cursor))));
    }

    pub fn expired(&self) {
        self.push(Ok(RawEvent::Expired));
    }

    pub fn unrecognized(&self, reason: &str) {
        self.push(Ok(RawEvent::Unrecognized(reason.to_string())));
    }

    pub fn fail(&self) {
        self.push(Err(Error::Custom("connection reset by peer".to_string())));
    }

    /// End the stream the way a server-side timeout does
    pub fn close(self) {}
}

#[derive(Default)]
struct Script {
    lists: VecDeque<Result<Listing>>,
    watches: VecDeque<Result<mpsc::UnboundedReceiver<Result<RawEvent>>>>,
    list_calls: usize,
    watch_cursors: Vec<Cursor>,
}

/// Replays queued list results and watch streams in order.
///
/// Once a queue runs dry, further calls wait forever so the informer idles.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_list(&self, items: Vec<ResourceState>, cursor: &str) {
        self.script.lock().unwrap().lists.push_back(Ok(Listing {
            items,
            cursor: Cursor::new(cursor),
        }));
    }

    pub fn push_list_failure(&self) {
        self.script
            .lock()
            .unwrap()
            .lists
            .push_back(Err(Error::Custom("apiserver unavailable".to_string())));
    }

    pub fn push_watch(&self) -> WatchFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script.lock().unwrap().watches.push_back(Ok(rx));
        WatchFeed(tx)
    }

    pub fn push_watch_failure(&self, error: Error) {
        self.script.lock().unwrap().watches.push_back(Err(error));
    }

    pub fn list_calls(&self) -> usize {
        self.script.lock().unwrap().list_calls
    }

    pub fn watch_cursors(&self) -> Vec<String> {
        self.script
            .lock()
            .unwrap()
            .watch_cursors
            .iter()
            .map(|c| c.as_str().to_string())
            .collect()
    }
}

#[async_trait]
impl ListerWatcher for ScriptedSource {
    fn kind(&self) -> &str {
        "Pod"
    }

    async fn list(&self, _selectors: &Selectors) -> Result<Listing> {
        let next = {
            let mut script = self.script.lock().unwrap();
            script.list_calls += 1;
            script.lists.pop_front()
        };
        match next {
            Some(result) => result,
            None => futures::future::pending().await,
        }
    }

    async fn watch(&self, _selectors: &Selectors, cursor: &Cursor) -> Result<WatchStream> {
        let next = {
            let mut script = self.script.lock().unwrap();
            script.watch_cursors.push(cursor.clone());
            script.watches.pop_front()
        };
        match next {
            Some(Ok(rx)) => Ok(UnboundedReceiverStream::new(rx).boxed()),
            Some(Err(e)) => Err(e),
            None => Ok(futures::stream::pending().boxed()),
        }
    }
}

/// Handler that forwards every `(old, new)` pair as labels
pub fn recorder() -> (impl ResourceEventHandler, mpsc::UnboundedReceiver<Seen>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = handler_fn(move |old, new| -> Result<()> {
        let _ = tx.send((label(old), label(new)));
        Ok(())
    });
    (handler, rx)
}

pub async fn expect_next(rx: &mut mpsc::UnboundedReceiver<Seen>) -> Seen {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a transition")
        .expect("handler channel closed")
}

pub async fn expect_quiet(rx: &mut mpsc::UnboundedReceiver<Seen>) {
    if let Ok(Some(extra)) = timeout(Duration::from_millis(150), rx.recv()).await {
        panic!("unexpected transition {extra:?}");
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until(condition: impl Fn() -> bool) {
    let waited = timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached in time");
}
