//! Append-only per-target sample history with windowed aggregate queries.
//!
//! Every query takes a window length `D` and a reference instant `t` and
//! looks at exactly the samples whose timestamp lies in `[t - D, t]`,
//! both ends inclusive.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use super::models::Sample;

/// Store error types.
#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("sample at {got} is older than the newest stored sample at {newest}")]
    OutOfOrder {
        got: DateTime<Utc>,
        newest: DateTime<Utc>,
    },
}

/// Aggregates over one window of one target's samples.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowStats {
    pub count: usize,
    /// Fraction of samples answered with 200, `0.0` for an empty window
    pub availability: f64,
    /// Seconds, `None` when no sample in the window got a response
    pub avg_response_time: Option<f64>,
    pub max_response_time: Option<f64>,
    pub response_codes: BTreeMap<i32, usize>,
}

impl WindowStats {
    fn from_samples(samples: &[Sample]) -> Self {
        Self {
            count: samples.len(),
            availability: availability(samples),
            avg_response_time: avg_response_time(samples),
            max_response_time: max_response_time(samples),
            response_codes: response_codes(samples),
        }
    }
}

/// Time-ordered, append-only record of probe outcomes.
#[derive(Debug, Default)]
pub struct SampleStore {
    samples: Vec<Sample>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample. Timestamps must be non-decreasing.
    pub fn push(&mut self, sample: Sample) -> Result<(), StoreError> {
        if let Some(newest) = self.samples.last() {
            if sample.timestamp < newest.timestamp {
                return Err(StoreError::OutOfOrder {
                    got: sample.timestamp,
                    newest: newest.timestamp,
                });
            }
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The samples with timestamps in `[at - duration, at]`.
    pub fn window(&self, duration: Duration, at: DateTime<Utc>) -> &[Sample] {
        let start = window_start(duration, at);
        let lo = self.samples.partition_point(|s| s.timestamp < start);
        let hi = self.samples.partition_point(|s| s.timestamp <= at);
        if lo >= hi {
            return &[];
        }
        &self.samples[lo..hi]
    }

    pub fn count(&self, duration: Duration, at: DateTime<Utc>) -> usize {
        self.window(duration, at).len()
    }

    pub fn availability(&self, duration: Duration, at: DateTime<Utc>) -> f64 {
        availability(self.window(duration, at))
    }

    pub fn max_response_time(&self, duration: Duration, at: DateTime<Utc>) -> Option<f64> {
        max_response_time(self.window(duration, at))
    }

    pub fn avg_response_time(&self, duration: Duration, at: DateTime<Utc>) -> Option<f64> {
        avg_response_time(self.window(duration, at))
    }

    pub fn response_codes(&self, duration: Duration, at: DateTime<Utc>) -> BTreeMap<i32, usize> {
        response_codes(self.window(duration, at))
    }

    /// All aggregates for one window at once.
    pub fn stats(&self, duration: Duration, at: DateTime<Utc>) -> WindowStats {
        WindowStats::from_samples(self.window(duration, at))
    }
}

fn window_start(duration: Duration, at: DateTime<Utc>) -> DateTime<Utc> {
    let span = TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX);
    at.checked_sub_signed(span)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn availability(samples: &[Sample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let ok = samples.iter().filter(|s| s.status == 200).count();
    ok as f64 / samples.len() as f64
}

fn response_times(samples: &[Sample]) -> impl Iterator<Item = f64> + '_ {
    samples
        .iter()
        .filter(|s| !s.is_failure())
        .filter_map(|s| s.elapsed)
        .map(|d| d.as_secs_f64())
}

fn max_response_time(samples: &[Sample]) -> Option<f64> {
    response_times(samples).reduce(f64::max)
}

fn avg_response_time(samples: &[Sample]) -> Option<f64> {
    let (sum, n) = response_times(samples).fold((0.0, 0usize), |(sum, n), t| (sum + t, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

fn response_codes(samples: &[Sample]) -> BTreeMap<i32, usize> {
    let mut codes = BTreeMap::new();
    for s in samples {
        *codes.entry(s.status).or_insert(0) += 1;
    }
    codes
}
