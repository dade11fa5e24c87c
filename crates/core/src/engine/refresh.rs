use chrono::{DateTime, Duration, Utc};

/// Decides when the next request should trigger a full rebuild.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPolicy {
    interval: Duration,
}

impl RefreshPolicy {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// A generation that never loaded is always due.
    pub fn is_due(&self, last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_updated {
            None => true,
            Some(last_updated) => now - last_updated > self.interval,
        }
    }
}
