// Service for throttling repeated mail alerts.

use crate::core::LogRecord;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;

/// Sentinel key that throttles all alert traffic, not just repeats of one
/// message.
pub const GLOBAL_KEY: &str = "general";

/// Default window for the global sentinel key.
pub const DEFAULT_GLOBAL_WINDOW: Duration = Duration::from_secs(60);

/// Default window for a message-specific key.
pub const DEFAULT_MESSAGE_WINDOW: Duration = Duration::from_secs(600);

/// A concurrent cache mapping an alert key to the time it was last sent.
///
/// Entries are created on first send, overwritten on every later permitted
/// send, and never evicted: memory grows with the number of distinct message
/// strings seen. That is an accepted bound for low-cardinality alerting, not
/// a bug.
///
/// The map is guarded by a readers-writer lock so that many emitters can
/// check `can_send_alert` concurrently while `record_sent` writers are
/// serialized against each other and against readers.
pub struct SuppressionStore {
    last_sent: RwLock<HashMap<String, Instant>>,
    global_window: Duration,
    message_window: Duration,
}

impl SuppressionStore {
    /// Creates a store with the default windows (global 1 minute, message
    /// 10 minutes).
    pub fn new() -> Self {
        Self::with_windows(DEFAULT_GLOBAL_WINDOW, DEFAULT_MESSAGE_WINDOW)
    }

    /// Creates a store with explicit windows. The global window should be
    /// strictly shorter than the message window so an alert storm is
    /// throttled quickly while per-message repeats stay quiet longer.
    pub fn with_windows(global_window: Duration, message_window: Duration) -> Self {
        Self {
            last_sent: RwLock::new(HashMap::new()),
            global_window,
            message_window,
        }
    }

    /// Returns true iff no entry exists for `key`, or the entry's timestamp
    /// plus `window` is not after the current time.
    pub fn permit(&self, key: &str, window: Duration) -> bool {
        let map = self.last_sent.read().expect("suppression lock poisoned");
        match map.get(key) {
            Some(sent_at) => *sent_at + window <= Instant::now(),
            None => true,
        }
    }

    /// Stamps the current time against every given key, unconditionally.
    pub fn record_sent<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = Instant::now();
        let mut map = self.last_sent.write().expect("suppression lock poisoned");
        for key in keys {
            map.insert(key.into(), now);
        }
        metrics::gauge!("suppression_store_entries").set(map.len() as f64);
    }

    /// Marks `record` as sent under both the global key and its
    /// message-specific key.
    pub fn mark_sent(&self, record: &LogRecord) {
        self.record_sent([GLOBAL_KEY, record.message.as_str()]);
    }

    /// Composite check: a mail alert may be delivered only if both the
    /// global-key window and the message-specific-key window have elapsed.
    pub fn can_send_alert(&self, record: &LogRecord) -> bool {
        if !self.permit(GLOBAL_KEY, self.global_window) {
            metrics::counter!("alerts_suppressed", "window" => "global").increment(1);
            return false;
        }
        if !self.permit(&record.message, self.message_window) {
            metrics::counter!("alerts_suppressed", "window" => "message").increment(1);
            return false;
        }
        true
    }
}

impl Default for SuppressionStore {
    fn default() -> Self {
        Self::new()
    }
}
