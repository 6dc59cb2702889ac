//! Per-target Up/Down alerting driven by short-window availability.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

use crate::store::{Sample, StoreError, Target};

/// Lookback window used for alert evaluation.
pub const ALERT_WINDOW: Duration = Duration::from_secs(120);

/// Availability threshold. The exact value is a dead band: it neither
/// raises nor clears an alert.
pub const ALERT_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Up,
    Down,
}

impl AlertState {
    /// Next state for the given availability, or `None` when nothing changes.
    pub fn transition(self, availability: f64) -> Option<AlertState> {
        match self {
            AlertState::Up if availability < ALERT_THRESHOLD => Some(AlertState::Down),
            AlertState::Down if availability > ALERT_THRESHOLD => Some(AlertState::Up),
            _ => None,
        }
    }
}

/// Emitted once per actual state change.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub url: String,
    pub state: AlertState,
    pub availability: f64,
    pub time: DateTime<Utc>,
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.state {
            AlertState::Down => "is down",
            AlertState::Up => "recovered",
        };
        write!(
            f,
            "Website {} {}. availability={}, time={}",
            self.url,
            what,
            self.availability,
            self.time.format("%Y-%m-%d %H:%M:%S%.6f")
        )
    }
}

impl Target {
    /// Re-evaluate the alert state against the window ending at `now`.
    pub fn evaluate_alert(&mut self, now: DateTime<Utc>) -> Option<AlertEvent> {
        let availability = self.samples.availability(ALERT_WINDOW, now);
        let next = self.alert.transition(availability)?;
        self.alert = next;
        Some(AlertEvent {
            url: self.url.clone(),
            state: next,
            availability,
            time: now,
        })
    }

    /// Append a sample and evaluate the alert at the sample's timestamp.
    pub fn record(&mut self, sample: Sample) -> Result<Option<AlertEvent>, StoreError> {
        let now = sample.timestamp;
        self.samples.push(sample)?;
        Ok(self.evaluate_alert(now))
    }
}
