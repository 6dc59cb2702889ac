//! Pulsewatch command-line entry point.

use pulsewatch::clock::Clock;
use pulsewatch::config;
use pulsewatch::monitor::{ConsoleSink, Monitor};
use pulsewatch::probe::HttpProber;
use pulsewatch::scheduler::EventLoop;
use pulsewatch::store::Target;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// A performance monitoring tool for websites.
#[derive(Parser, Debug)]
#[command(name = "pulsewatch", version)]
struct Cli {
    /// File listing the websites to monitor, one `<url> <interval-seconds>` per line
    targets: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("pulsewatch=info".parse()?))
        .init();

    let cli = Cli::parse();

    let targets: Vec<Target> = config::load_targets(&cli.targets)?
        .into_iter()
        .map(Target::from)
        .collect();
    tracing::info!("Loaded {} targets from {}", targets.len(), cli.targets.display());

    let prober = HttpProber::new()?;
    let clock = Clock::new();
    let mut monitor = Monitor::new(targets, prober, ConsoleSink, clock);

    let mut event_loop = EventLoop::new();
    monitor.seed(event_loop.scheduler(), clock.origin());

    println!("Starting monitoring...");
    event_loop.run(&mut monitor).await?;

    Ok(())
}
