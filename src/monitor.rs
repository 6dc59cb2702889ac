//! Probe and report tasks running on the event loop.

use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::alert::{AlertEvent, AlertState};
use crate::clock::Clock;
use crate::probe::{ProbeOutcome, Prober};
use crate::report::Report;
use crate::scheduler::{Dispatch, Schedule};
use crate::store::{StoreError, Target};

/// Every task uses the same priority, so ties fall back to insertion order.
pub const TASK_PRIORITY: u8 = 1;

/// Cadence and lookback of a periodic report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSpec {
    pub period: Duration,
    pub window: Duration,
}

pub const SHORT_REPORT: ReportSpec = ReportSpec {
    period: Duration::from_secs(10),
    window: Duration::from_secs(600),
};

pub const LONG_REPORT: ReportSpec = ReportSpec {
    period: Duration::from_secs(60),
    window: Duration::from_secs(3600),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Probe the target at this index
    Probe(usize),
    Report(ReportSpec),
}

/// Monitor error types. Any of these stops the event loop.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("no target with index {0}")]
    UnknownTarget(usize),
}

/// Receives alert events and reports.
pub trait Sink {
    fn alert(&mut self, event: &AlertEvent);
    fn report(&mut self, report: &Report);
}

/// Prints alerts and reports to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn alert(&mut self, event: &AlertEvent) {
        match event.state {
            AlertState::Down => tracing::debug!(
                url = %event.url,
                availability = event.availability,
                "Target is down"
            ),
            AlertState::Up => tracing::debug!(
                url = %event.url,
                availability = event.availability,
                "Target recovered"
            ),
        }
        println!("{}", event);
    }

    fn report(&mut self, report: &Report) {
        print!("{}", report.render());
    }
}

/// Owns the targets and runs the tasks the event loop hands it.
pub struct Monitor<P, S> {
    targets: Vec<Target>,
    prober: P,
    sink: S,
    clock: Clock,
}

impl<P: Prober, S: Sink> Monitor<P, S> {
    pub fn new(targets: Vec<Target>, prober: P, sink: S, clock: Clock) -> Self {
        Self {
            targets,
            prober,
            sink,
            clock,
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Queue the first occurrence of every task, one period after `start`.
    pub fn seed(&self, scheduler: &mut dyn Schedule<Task>, start: Instant) {
        tracing::info!("Scheduling {} targets", self.targets.len());

        for (i, target) in self.targets.iter().enumerate() {
            scheduler.enqueue(start + target.interval, TASK_PRIORITY, Task::Probe(i));
        }
        for spec in [SHORT_REPORT, LONG_REPORT] {
            scheduler.enqueue(start + spec.period, TASK_PRIORITY, Task::Report(spec));
        }
    }

    fn period(&self, task: Task) -> Result<Duration, MonitorError> {
        match task {
            Task::Probe(i) => self
                .targets
                .get(i)
                .map(|t| t.interval)
                .ok_or(MonitorError::UnknownTarget(i)),
            Task::Report(spec) => Ok(spec.period),
        }
    }

    /// Probe one target, store the outcome and re-evaluate its alert.
    async fn run_probe(&mut self, index: usize) -> Result<(), MonitorError> {
        let target = self
            .targets
            .get_mut(index)
            .ok_or(MonitorError::UnknownTarget(index))?;

        let outcome = self.prober.probe(&target.url).await;
        if let ProbeOutcome::Failed(e) = &outcome {
            tracing::debug!(url = %target.url, "Probe failed: {}", e);
        }
        let sample = outcome.into_sample(self.clock.now());
        tracing::debug!(
            url = %target.url,
            status = sample.status,
            elapsed = ?sample.elapsed,
            "Probe complete"
        );

        if let Some(event) = target.record(sample)? {
            self.sink.alert(&event);
        }
        Ok(())
    }

    fn run_report(&mut self, spec: ReportSpec, fired_at: Instant) {
        let report = Report::collect(&self.targets, spec.window, self.clock.at(fired_at));
        self.sink.report(&report);
    }
}

impl<P: Prober, S: Sink> Dispatch<Task> for Monitor<P, S> {
    type Error = MonitorError;

    async fn dispatch(
        &mut self,
        task: Task,
        fired_at: Instant,
        scheduler: &mut dyn Schedule<Task>,
    ) -> Result<(), MonitorError> {
        match task {
            Task::Probe(i) => self.run_probe(i).await?,
            Task::Report(spec) => self.run_report(spec, fired_at),
        }

        let period = self.period(task)?;
        scheduler.enqueue(fired_at + period, TASK_PRIORITY, task);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeError;
    use crate::scheduler::EventLoop;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use std::cell::RefCell;
    use std::ops::Range;

    /// Fails during `outage` (offsets from `start`), otherwise answers 200.
    struct ScriptedProber {
        start: Instant,
        outage: Range<Duration>,
        latency: Duration,
        calls: RefCell<Vec<(String, Duration)>>,
    }

    impl ScriptedProber {
        fn new(start: Instant) -> Self {
            Self {
                start,
                outage: Duration::ZERO..Duration::ZERO,
                latency: Duration::ZERO,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn call_offsets(&self, url: &str) -> Vec<u64> {
            self.calls
                .borrow()
                .iter()
                .filter(|(u, _)| u == url)
                .map(|(_, d)| d.as_secs())
                .collect()
        }
    }

    impl Prober for ScriptedProber {
        async fn probe(&self, url: &str) -> ProbeOutcome {
            let offset = Instant::now() - self.start;
            self.calls.borrow_mut().push((url.to_string(), offset));
            tokio::time::sleep(self.latency).await;

            if self.outage.contains(&offset) {
                ProbeOutcome::Failed(ProbeError::Network("connection refused".to_string()))
            } else {
                ProbeOutcome::Ok { status: 200, elapsed: self.latency }
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        alerts: Vec<AlertEvent>,
        reports: Vec<Report>,
    }

    impl Sink for RecordingSink {
        fn alert(&mut self, event: &AlertEvent) {
            self.alerts.push(event.clone());
        }

        fn report(&mut self, report: &Report) {
            self.reports.push(report.clone());
        }
    }

    fn wall() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn monitor(
        targets: &[(&str, u64)],
        prober: ScriptedProber,
        start: Instant,
    ) -> (Monitor<ScriptedProber, RecordingSink>, EventLoop<Task>) {
        let targets = targets
            .iter()
            .map(|(url, interval)| Target::new(*url, secs(*interval)))
            .collect();
        let clock = Clock::anchored(start, wall());
        let monitor = Monitor::new(targets, prober, RecordingSink::default(), clock);
        let mut event_loop = EventLoop::new();
        monitor.seed(event_loop.scheduler(), start);
        (monitor, event_loop)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_probe_fires_one_interval_after_start() {
        let start = Instant::now();
        let (mut monitor, mut event_loop) =
            monitor(&[("http://example.com", 30)], ScriptedProber::new(start), start);

        event_loop.run_until(&mut monitor, start + secs(29)).await.unwrap();
        assert!(monitor.prober.call_offsets("http://example.com").is_empty());

        event_loop.run_until(&mut monitor, start + secs(95)).await.unwrap();
        assert_eq!(monitor.prober.call_offsets("http://example.com"), vec![30, 60, 90]);
        assert_eq!(monitor.targets()[0].samples.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_targets_use_their_own_intervals() {
        let start = Instant::now();
        let (mut monitor, mut event_loop) = monitor(
            &[("http://a.test", 7), ("http://b.test", 20)],
            ScriptedProber::new(start),
            start,
        );

        event_loop.run_until(&mut monitor, start + secs(40)).await.unwrap();
        assert_eq!(monitor.prober.call_offsets("http://a.test"), vec![7, 14, 21, 28, 35]);
        assert_eq!(monitor.prober.call_offsets("http://b.test"), vec![20, 40]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_cadence_and_windows() {
        let start = Instant::now();
        let (mut monitor, mut event_loop) =
            monitor(&[("http://a.test", 5)], ScriptedProber::new(start), start);

        event_loop.run_until(&mut monitor, start + secs(120)).await.unwrap();

        let reports = &monitor.sink().reports;
        let short: Vec<_> = reports.iter().filter(|r| r.window == secs(600)).collect();
        let long: Vec<_> = reports.iter().filter(|r| r.window == secs(3600)).collect();
        assert_eq!(short.len(), 12);
        assert_eq!(long.len(), 2);

        for (i, report) in short.iter().enumerate() {
            let fired = 10 * (i as i64 + 1);
            assert_eq!(report.at, wall() + TimeDelta::seconds(fired));
            // The report due at t was queued before the probe due at t, so it
            // sees the probes at 5, 10, ..., t - 5
            assert_eq!(report.targets[0].stats.count, (fired / 5 - 1) as usize);
        }
        assert_eq!(long[0].at, wall() + TimeDelta::seconds(60));
        assert_eq!(long[1].at, wall() + TimeDelta::seconds(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_window_ignores_older_samples() {
        let start = Instant::now();
        let (mut monitor, mut event_loop) =
            monitor(&[("http://a.test", 100)], ScriptedProber::new(start), start);

        event_loop.run_until(&mut monitor, start + secs(800)).await.unwrap();

        let last = monitor
            .sink()
            .reports
            .iter()
            .filter(|r| r.window == secs(600))
            .last()
            .unwrap();
        assert_eq!(last.at, wall() + TimeDelta::seconds(800));
        // Window [200, 800] holds the probes at 200..=800
        assert_eq!(last.targets[0].stats.count, 7);
        assert_eq!(monitor.targets()[0].samples.len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outage_raises_and_clears_one_alert() {
        let start = Instant::now();
        let mut prober = ScriptedProber::new(start);
        prober.outage = secs(0)..secs(151);
        let (mut monitor, mut event_loop) = monitor(&[("http://flaky.test", 10)], prober, start);

        event_loop.run_until(&mut monitor, start + secs(400)).await.unwrap();

        let alerts = &monitor.sink().alerts;
        assert_eq!(alerts.len(), 2);

        assert_eq!(alerts[0].state, AlertState::Down);
        assert_eq!(alerts[0].availability, 0.0);
        assert_eq!(alerts[0].time, wall() + TimeDelta::seconds(10));

        // At t=260 the window [140, 260] holds 2 failures and 11 successes
        assert_eq!(alerts[1].state, AlertState::Up);
        assert_eq!(alerts[1].time, wall() + TimeDelta::seconds(260));
        assert!((alerts[1].availability - 11.0 / 13.0).abs() < 1e-9);

        assert_eq!(monitor.targets()[0].alert, AlertState::Up);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_probe_delays_but_does_not_drift() {
        let start = Instant::now();
        let mut prober = ScriptedProber::new(start);
        prober.latency = secs(4);
        let (mut monitor, mut event_loop) = monitor(&[("http://slow.test", 10)], prober, start);

        event_loop.run_until(&mut monitor, start + secs(30)).await.unwrap();
        assert_eq!(monitor.prober.call_offsets("http://slow.test"), vec![10, 20, 30]);

        // The report due at t=10 waited for the probe, but still covers the
        // window ending at its own fire time
        let first = &monitor.sink().reports[0];
        assert_eq!(first.at, wall() + TimeDelta::seconds(10));
        assert_eq!(first.targets[0].stats.count, 0);

        // Samples are stamped when the probe completes
        let stamps: Vec<_> = monitor.targets()[0]
            .samples
            .window(secs(3600), wall() + TimeDelta::seconds(100))
            .iter()
            .map(|s| s.timestamp)
            .collect();
        assert_eq!(
            stamps,
            vec![
                wall() + TimeDelta::seconds(14),
                wall() + TimeDelta::seconds(24),
                wall() + TimeDelta::seconds(34),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_target_is_fatal() {
        let start = Instant::now();
        let (mut monitor, _) = monitor(&[("http://a.test", 10)], ScriptedProber::new(start), start);
        let mut event_loop = EventLoop::new();
        event_loop.scheduler().enqueue(start + secs(1), TASK_PRIORITY, Task::Probe(3));

        let result = event_loop.run_until(&mut monitor, start + secs(5)).await;
        assert!(matches!(result, Err(MonitorError::UnknownTarget(3))));
    }
}
