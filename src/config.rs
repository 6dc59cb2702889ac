//! Target list loading.
//!
//! The target file holds one `<url> <interval-seconds>` pair per line.
//! Any malformed line aborts startup.

use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::store::Target;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read target file: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected `<url> <interval-seconds>`, found {found} fields")]
    TokenCount { line: usize, found: usize },
    #[error("line {line}: interval `{value}` is not a whole number of seconds")]
    Interval { line: usize, value: String },
    #[error("line {line}: interval must be greater than zero")]
    ZeroInterval { line: usize },
    #[error("no targets configured")]
    Empty,
}

/// One configured target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub url: String,
    pub interval: Duration,
}

impl From<TargetConfig> for Target {
    fn from(cfg: TargetConfig) -> Self {
        Target::new(cfg.url, cfg.interval)
    }
}

/// Read and parse the target file at `path`.
pub fn load_targets<P: AsRef<Path>>(path: P) -> Result<Vec<TargetConfig>, ConfigError> {
    let contents = fs::read_to_string(path)?;
    parse_targets(&contents)
}

/// Parse target definitions. Fields are separated by exactly one space.
pub fn parse_targets(contents: &str) -> Result<Vec<TargetConfig>, ConfigError> {
    let mut targets = Vec::new();

    for (i, raw) in contents.lines().enumerate() {
        let line = i + 1;
        let fields: Vec<&str> = if raw.is_empty() {
            Vec::new()
        } else {
            raw.split(' ').collect()
        };
        match fields.as_slice() {
            [url, interval] => {
                let secs: u64 = interval.parse().map_err(|_| ConfigError::Interval {
                    line,
                    value: interval.to_string(),
                })?;
                if secs == 0 {
                    return Err(ConfigError::ZeroInterval { line });
                }
                targets.push(TargetConfig {
                    url: url.to_string(),
                    interval: Duration::from_secs(secs),
                });
            }
            other => {
                return Err(ConfigError::TokenCount {
                    line,
                    found: other.len(),
                })
            }
        }
    }

    if targets.is_empty() {
        return Err(ConfigError::Empty);
    }
    Ok(targets)
}
