/**
 * List-Watch session
 *
 * Lists the collection, watches from the listing's cursor and falls back to
 * a fresh list whenever the stream fails or the cursor expires. Failures are
 * retried with exponential backoff and never surface to the caller; the only
 * way out is the stop token.
 */
use super::config::{Backoff, InformerConfig};
use super::errors::is_expired;
use super::resource::{Cursor, ResourceState, Selectors};
use super::source::{ListerWatcher, RawEvent, WatchStream};
use super::stats::{record, ConnectionStatus, SharedStats};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the session hands to the dispatcher lane
#[derive(Debug)]
pub enum SessionEvent {
    /// Complete current contents of the collection
    Listed(Vec<ResourceState>),
    /// One object event from the watch stream
    Watched(RawEvent),
}

enum Phase {
    List,
    Watch,
    Streaming(WatchStream),
}

pub struct ListWatchSession<'a, S: ?Sized> {
    source: &'a S,
    selectors: &'a Selectors,
    config: &'a InformerConfig,
    stop: CancellationToken,
    stats: SharedStats,
    cursor: Option<Cursor>,
    backoff: Backoff,
    /// One re-list after expiry or a clean close may skip the backoff; re-armed by stream progress
    relist_now: bool,
    listed_once: bool,
    phase: Phase,
}

impl<'a, S: ListerWatcher + ?Sized> ListWatchSession<'a, S> {
    #[must_use]
    pub fn new(
        source: &'a S,
        selectors: &'a Selectors,
        config: &'a InformerConfig,
        stop: CancellationToken,
        stats: SharedStats,
    ) -> Self {
        Self {
            source,
            selectors,
            config,
            stop,
            stats,
            cursor: None,
            backoff: Backoff::from_config(config),
            relist_now: true,
            listed_once: false,
            phase: Phase::List,
        }
    }

    /// Cursor the next watch would resume from
    #[must_use]
    pub const fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Wait for the next listing or watch event. Returns `None` only once stopped.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if self.stop.is_cancelled() {
                return None;
            }
            match std::mem::replace(&mut self.phase, Phase::List) {
                Phase::List => {
                    if let Some(items) = self.list().await? {
                        return Some(SessionEvent::Listed(items));
                    }
                }
                Phase::Watch => self.open_watch().await?,
                Phase::Streaming(stream) => {
                    if let Some(event) = self.read_stream(stream).await? {
                        return Some(SessionEvent::Watched(event));
                    }
                }
            }
        }
    }

    /// `Some(None)` means the list failed and the session has already backed off
    async fn list(&mut self) -> Option<Option<Vec<ResourceState>>> {
        self.set_status(ConnectionStatus::Listing);
        let listed = tokio::select! {
            () = self.stop.cancelled() => return None,
            listed = self.source.list(self.selectors) => listed,
        };
        match listed {
            Ok(listing) => {
                debug!("📋 {} list returned {} items at {}", self.source.kind(), listing.items.len(), listing.cursor);
                if self.listed_once {
                    record(&self.stats, |s| s.relists += 1);
                }
                self.listed_once = true;
                self.cursor = Some(listing.cursor);
                self.phase = Phase::Watch;
                Some(Some(listing.items))
            }
            Err(e) => {
                warn!("❌ {} list failed: {}", self.source.kind(), e);
                self.pause().await?;
                Some(None)
            }
        }
    }

    async fn open_watch(&mut self) -> Option<()> {
        let Some(cursor) = self.cursor.clone() else {
            return Some(());
        };
        let opened = tokio::select! {
            () = self.stop.cancelled() => return None,
            opened = self.source.watch(self.selectors, &cursor) => opened,
        };
        match opened {
            Ok(stream) => {
                self.set_status(ConnectionStatus::Watching);
                self.phase = Phase::Streaming(stream);
            }
            Err(e) if is_expired(&e) => {
                info!("⌛ {} cursor {} expired, re-listing", self.source.kind(), cursor);
                self.relist().await?;
            }
            Err(e) => {
                warn!("❌ {} watch failed to open: {}", self.source.kind(), e);
                self.cursor = None;
                self.pause().await?;
            }
        }
        Some(())
    }

    /// `Some(None)` means no event to deliver yet; the phase says what comes next
    async fn read_stream(&mut self, mut stream: WatchStream) -> Option<Option<RawEvent>> {
        let next = tokio::select! {
            () = self.stop.cancelled() => return None,
            next = stream.next() => next,
        };
        match next {
            Some(Ok(RawEvent::Expired)) => {
                info!("⌛ {} watch expired, re-listing", self.source.kind());
                self.relist().await?;
            }
            Some(Ok(RawEvent::Bookmark(cursor))) => {
                self.progressed();
                self.cursor = Some(cursor);
                self.phase = Phase::Streaming(stream);
            }
            Some(Ok(RawEvent::Unrecognized(reason))) => {
                warn!("Dropping unrecognized {} watch event: {}", self.source.kind(), reason);
                record(&self.stats, |s| s.dropped_events += 1);
                self.phase = Phase::Streaming(stream);
            }
            Some(Ok(event)) => {
                self.progressed();
                if let Some(cursor) = event.cursor() {
                    self.cursor = Some(cursor);
                }
                self.phase = Phase::Streaming(stream);
                return Some(Some(event));
            }
            Some(Err(e)) if is_expired(&e) => {
                info!("⌛ {} watch expired: {}, re-listing", self.source.kind(), e);
                self.relist().await?;
            }
            Some(Err(e)) => {
                warn!("❌ {} watch stream failed: {}, re-listing", self.source.kind(), e);
                self.cursor = None;
                self.pause().await?;
            }
            None if self.config.relist_on_watch_close => {
                info!("🔍 {} watch stream ended, re-listing", self.source.kind());
                self.relist().await?;
            }
            None => {
                info!("🔍 {} watch stream ended, resuming from {:?}", self.source.kind(), self.cursor);
                self.phase = Phase::Watch;
                sleep_or_stop(&self.stop, self.config.restart_delay).await?;
            }
        }
        Some(None)
    }

    fn progressed(&mut self) {
        self.backoff.reset();
        self.relist_now = true;
    }

    /// Drop the cursor and go back to listing. Only the first such re-list
    /// since the stream last made progress skips the backoff.
    async fn relist(&mut self) -> Option<()> {
        self.cursor = None;
        if std::mem::take(&mut self.relist_now) {
            return Some(());
        }
        self.pause().await
    }

    async fn pause(&mut self) -> Option<()> {
        self.set_status(ConnectionStatus::Reconnecting);
        let delay = self.backoff.next_delay();
        debug!("⏳ {} restarting in {:?}", self.source.kind(), delay);
        sleep_or_stop(&self.stop, delay).await
    }

    fn set_status(&self, status: ConnectionStatus) {
        record(&self.stats, |s| s.connection_status = status);
    }
}

async fn sleep_or_stop(stop: &CancellationToken, delay: Duration) -> Option<()> {
    tokio::select! {
        () = stop.cancelled() => None,
        () = sleep(delay) => Some(()),
    }
}
