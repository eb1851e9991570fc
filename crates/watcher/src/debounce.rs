use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

/// Per-path event suppression: an event within `window` of the previous
/// event for the same path is dropped.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_seen: HashMap<String, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: HashMap::new(),
        }
    }

    /// Record an event for `key` at `now`; false when it should be dropped.
    ///
    /// Dropped events do not extend the window.
    pub fn admit(&mut self, key: &str, now: Instant) -> bool {
        if let Some(previous) = self.last_seen.get(key) {
            if now.saturating_duration_since(*previous) < self.window {
                return false;
            }
        }
        self.last_seen.insert(key.to_string(), now);
        true
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
