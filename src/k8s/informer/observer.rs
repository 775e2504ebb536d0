/**
 * Informer: one list-watch session feeding one dispatcher lane
 *
 * The lane runs on a background task. Transitions for the collection are
 * delivered strictly in arrival order; stopping the informer ends the
 * stream, cancels retries and guarantees no further handler calls.
 */
use super::config::InformerConfig;
use super::dispatcher::Dispatcher;
use super::handler::ResourceEventHandler;
use super::kube_source::{CollectionKind, KubeListerWatcher};
use super::normalizer::{normalize, vanished};
use super::resource::{ResourceIdentity, Selectors};
use super::session::{ListWatchSession, SessionEvent};
use super::source::{ListerWatcher, RawEvent};
use super::stats::{record, snapshot, ConnectionStatus, InformerStats, SharedStats};
use crate::error::Result;
use kube::Client;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// An unstarted informer over any [`ListerWatcher`]
pub struct Informer<S> {
    source: S,
    selectors: Selectors,
    config: InformerConfig,
}

impl<S: ListerWatcher + 'static> Informer<S> {
    #[must_use]
    pub const fn new(source: S, selectors: Selectors, config: InformerConfig) -> Self {
        Self {
            source,
            selectors,
            config,
        }
    }

    /// Spawn the observation lane on the current tokio runtime
    #[must_use]
    pub fn start<H: ResourceEventHandler + 'static>(self, handler: H) -> InformerHandle {
        let id = Uuid::new_v4();
        let stop = CancellationToken::new();
        let stats: SharedStats = Arc::new(RwLock::new(InformerStats::default()));
        let (synced_tx, synced_rx) = watch::channel(false);

        let span = info_span!("informer", id = %id, kind = %self.source.kind());
        let lane = run_lane(self, handler, stop.clone(), stats.clone(), synced_tx);
        let task = tokio::spawn(lane.instrument(span));

        InformerHandle {
            id,
            stop,
            stats,
            synced: synced_rx,
            task: Some(task),
        }
    }
}

async fn run_lane<S, H>(
    informer: Informer<S>,
    handler: H,
    stop: CancellationToken,
    stats: SharedStats,
    synced: watch::Sender<bool>,
) where
    S: ListerWatcher,
    H: ResourceEventHandler,
{
    let Informer { source, selectors, config } = informer;
    info!("🚀 Informer started ({})", selectors);

    let mut session = ListWatchSession::new(&source, &selectors, &config, stop.clone(), stats.clone());
    let mut dispatcher = Dispatcher::new(handler, stats.clone());

    'lane: while let Some(event) = session.next_event().await {
        match event {
            SessionEvent::Listed(items) => {
                let mut listed: HashSet<ResourceIdentity> = HashSet::with_capacity(items.len());
                for state in items {
                    if stop.is_cancelled() {
                        break 'lane;
                    }
                    listed.insert(state.id().clone());
                    if let Some(transition) = normalize(dispatcher.store(), RawEvent::Added(state)) {
                        dispatcher.dispatch(transition).await;
                    }
                }
                for transition in vanished(dispatcher.store(), &listed) {
                    if stop.is_cancelled() {
                        break 'lane;
                    }
                    dispatcher.dispatch(transition).await;
                }
                if !*synced.borrow() {
                    info!("✅ Informer synced with {} resources", dispatcher.store().len());
                    synced.send_replace(true);
                }
            }
            SessionEvent::Watched(raw) => {
                if stop.is_cancelled() {
                    break;
                }
                if let Some(transition) = normalize(dispatcher.store(), raw) {
                    dispatcher.dispatch(transition).await;
                }
            }
        }
    }

    record(&stats, |s| s.connection_status = ConnectionStatus::Stopped);
    info!("🛑 Informer stopped");
}

/// Running informer. Dropping the handle stops it.
pub struct InformerHandle {
    id: Uuid,
    stop: CancellationToken,
    stats: SharedStats,
    synced: watch::Receiver<bool>,
    task: Option<JoinHandle<()>>,
}

impl InformerHandle {
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// True once the first complete listing has been delivered
    #[must_use]
    pub fn has_synced(&self) -> bool {
        *self.synced.borrow()
    }

    /// Wait until the first listing has been delivered.
    ///
    /// Returns false if the informer stopped before syncing.
    pub async fn wait_for_sync(&self) -> bool {
        let mut synced = self.synced.clone();
        synced.wait_for(|done| *done).await.is_ok()
    }

    #[must_use]
    pub fn stats(&self) -> InformerStats {
        snapshot(&self.stats)
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Signal the informer to stop without waiting for it
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    /// Stop the informer and wait for its lane to finish.
    ///
    /// No handler call starts after this returns.
    pub async fn stop(mut self) {
        self.stop.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Informer {} lane ended abnormally: {}", self.id, e);
            }
        }
    }
}

impl Drop for InformerHandle {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Start observing a Kubernetes collection.
///
/// `namespace` is ignored for cluster-scoped resources; `None` observes all
/// namespaces. Empty selectors select everything.
///
/// # Errors
///
/// Returns an error if a selector is malformed or the collection kind can not
/// be resolved through discovery
pub async fn observe<H: ResourceEventHandler + 'static>(
    client: Client,
    kind: &CollectionKind,
    namespace: Option<&str>,
    field_selector: &str,
    label_selector: &str,
    handler: H,
    config: InformerConfig,
) -> Result<InformerHandle> {
    let selectors = Selectors::new(field_selector, label_selector)?;
    let (resource, namespaced) = kind.resolve(&client).await?;
    let source = KubeListerWatcher::new(client, &resource, namespaced, namespace, &config);
    Ok(Informer::new(source, selectors, config).start(handler))
}
