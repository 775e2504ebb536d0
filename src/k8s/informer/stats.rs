use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Listing,
    Watching,
    Reconnecting,
    Stopped,
}

/// Counters for one informer
#[derive(Debug, Clone, Default)]
pub struct InformerStats {
    pub added: u64,
    pub updated: u64,
    pub deleted: u64,
    /// Deletions delivered without any recoverable state
    pub deleted_unknown: u64,
    pub handler_failures: u64,
    /// Successful listings after the initial one
    pub relists: u64,
    pub dropped_events: u64,
    pub connection_status: ConnectionStatus,
}

pub type SharedStats = Arc<RwLock<InformerStats>>;

/// Apply `update` to the shared counters, skipping it if the lock is poisoned
pub fn record(stats: &SharedStats, update: impl FnOnce(&mut InformerStats)) {
    if let Ok(mut stats) = stats.write() {
        update(&mut stats);
    }
}

/// Snapshot of the shared counters
#[must_use]
pub fn snapshot(stats: &SharedStats) -> InformerStats {
    stats
        .read()
        .map_or_else(|_| InformerStats::default(), |stats| stats.clone())
}
