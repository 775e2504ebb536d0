/**
 * Configuration constants for informers and their list-watch sessions
 */
use std::time::Duration;

/// Initial backoff in milliseconds after a failed list or watch
pub const INITIAL_BACKOFF_MILLIS: u64 = 1_000;

/// Maximum backoff in milliseconds between restart attempts
pub const MAX_BACKOFF_MILLIS: u64 = 60_000;

/// Watch stream timeout in seconds (294 vs 300 to allow 6 seconds for graceful shutdown)
pub const WATCH_TIMEOUT_SECONDS: u32 = 294;

/// Page size used when listing a collection
pub const DEFAULT_LIST_PAGE_SIZE: u32 = 500;

/// Brief delay before resuming a watch the server closed cleanly
pub const RESTART_DELAY_MILLIS: u64 = 1_000;

/// Tunables for one informer
#[derive(Debug, Clone)]
pub struct InformerConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Server-side timeout requested for each watch call
    pub watch_timeout_secs: u32,
    /// `None` lists the whole collection in one request
    pub list_page_size: Option<u32>,
    pub allow_bookmarks: bool,
    /// Re-list after every stream termination. When false, a clean server-side
    /// close resumes the watch from the current cursor instead.
    pub relist_on_watch_close: bool,
    pub restart_delay: Duration,
}

impl Default for InformerConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MILLIS),
            max_backoff: Duration::from_millis(MAX_BACKOFF_MILLIS),
            watch_timeout_secs: WATCH_TIMEOUT_SECONDS,
            list_page_size: Some(DEFAULT_LIST_PAGE_SIZE),
            allow_bookmarks: true,
            relist_on_watch_close: true,
            restart_delay: Duration::from_millis(RESTART_DELAY_MILLIS),
        }
    }
}

impl InformerConfig {
    #[must_use]
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    #[must_use]
    pub const fn with_watch_timeout(mut self, secs: u32) -> Self {
        self.watch_timeout_secs = secs;
        self
    }

    #[must_use]
    pub const fn with_list_page_size(mut self, page_size: Option<u32>) -> Self {
        self.list_page_size = page_size;
        self
    }

    #[must_use]
    pub const fn with_bookmarks(mut self, allow: bool) -> Self {
        self.allow_bookmarks = allow;
        self
    }

    #[must_use]
    pub const fn with_relist_on_watch_close(mut self, relist: bool) -> Self {
        self.relist_on_watch_close = relist;
        self
    }

    #[must_use]
    pub const fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }
}

/// Exponential backoff, doubling from `initial` up to `max`
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            current: initial,
        }
    }

    #[must_use]
    pub fn from_config(config: &InformerConfig) -> Self {
        Self::new(config.initial_backoff, config.max_backoff)
    }

    /// Delay to wait now; the following call waits twice as long
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub const fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Validate configuration constants at compile time
const _: () = {
    assert!(INITIAL_BACKOFF_MILLIS > 0, "INITIAL_BACKOFF_MILLIS must be greater than 0");
    assert!(MAX_BACKOFF_MILLIS >= INITIAL_BACKOFF_MILLIS, "MAX_BACKOFF_MILLIS must be at least INITIAL_BACKOFF_MILLIS");
    assert!(WATCH_TIMEOUT_SECONDS > 0, "WATCH_TIMEOUT_SECONDS must be greater than 0");
    assert!(DEFAULT_LIST_PAGE_SIZE > 0, "DEFAULT_LIST_PAGE_SIZE must be greater than 0");
    assert!(RESTART_DELAY_MILLIS > 0, "RESTART_DELAY_MILLIS must be greater than 0");
};
