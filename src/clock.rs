//! Maps the scheduler's monotonic instants onto wall-clock timestamps.

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

/// Wall clock anchored to a monotonic origin.
///
/// Timestamps handed out by the same clock never go backwards, and they
/// follow tokio's paused clock in tests.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
}

impl Clock {
    pub fn new() -> Self {
        Self::anchored(Instant::now(), Utc::now())
    }

    pub fn anchored(origin: Instant, wall_origin: DateTime<Utc>) -> Self {
        Self { origin, wall_origin }
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Wall-clock time of the given instant.
    pub fn at(&self, instant: Instant) -> DateTime<Utc> {
        let since = instant.saturating_duration_since(self.origin);
        let delta = TimeDelta::from_std(since).unwrap_or(TimeDelta::MAX);
        self.wall_origin
            .checked_add_signed(delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.at(Instant::now())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
