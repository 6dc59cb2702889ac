//! Pulsewatch - HTTP availability monitor.
//!
//! Probes a fixed list of URLs, each at its own interval, keeps every
//! outcome in memory, prints rolling availability and latency reports and
//! raises a down/recovered alert per target.

pub mod alert;
pub mod clock;
pub mod config;
pub mod monitor;
pub mod probe;
pub mod report;
pub mod scheduler;
pub mod store;
