//! Probe executor.
//!
//! A probe never fails past this boundary: every transport problem is
//! folded into `ProbeOutcome::Failed`.

mod http;

pub use http::*;

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::store::Sample;

/// Fixed per-request timeout.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("client setup failed: {0}")]
    Client(String),
}

/// Result of a single probe.
#[derive(Debug)]
pub enum ProbeOutcome {
    Ok { status: u16, elapsed: Duration },
    Failed(ProbeError),
}

impl ProbeOutcome {
    /// Convert into a stored sample, using the status sentinel for failures.
    pub fn into_sample(self, timestamp: DateTime<Utc>) -> Sample {
        match self {
            ProbeOutcome::Ok { status, elapsed } => Sample::success(timestamp, status, elapsed),
            ProbeOutcome::Failed(_) => Sample::failure(timestamp),
        }
    }
}

/// Something that can probe a URL.
#[allow(async_fn_in_trait)]
pub trait Prober {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}
