//! Sample and target model types.

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::SampleStore;
use crate::alert::AlertState;

/// Status code stored for a probe that never got a response
/// (timeout, refused connection, DNS or TLS failure).
pub const FAILED_STATUS: i32 = -1;

/// A single probe outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    /// HTTP status, or `FAILED_STATUS`
    pub status: i32,
    /// Request duration, `None` for failed probes
    pub elapsed: Option<Duration>,
}

impl Sample {
    pub fn success(timestamp: DateTime<Utc>, status: u16, elapsed: Duration) -> Self {
        Self {
            timestamp,
            status: i32::from(status),
            elapsed: Some(elapsed),
        }
    }

    pub fn failure(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            status: FAILED_STATUS,
            elapsed: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == FAILED_STATUS
    }
}

/// A monitored endpoint together with its history and alert state.
#[derive(Debug)]
pub struct Target {
    pub url: String,
    pub interval: Duration,
    pub samples: SampleStore,
    pub alert: AlertState,
}

impl Target {
    pub fn new(url: impl Into<String>, interval: Duration) -> Self {
        Self {
            url: url.into(),
            interval,
            samples: SampleStore::new(),
            alert: AlertState::Up,
        }
    }
}
