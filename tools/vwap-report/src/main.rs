//! Command-line VWAP session reporter.
//!
//! Replays a captured TotalView-ITCH 5.0 feed file (optionally
//! gzip-compressed) through the session pipeline and renders the
//! per-security VWAP snapshot series as a text table or JSON document.

mod sink;
mod source;

use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use types::timestamp::{NANOS_PER_HOUR, NANOS_PER_MIN};
use vwap_engine::aggregator::SessionWindow;
use vwap_engine::session::{DriverConfig, SessionDriver};

use sink::Format;

#[derive(Parser, Debug)]
#[command(
    name = "vwap-report",
    about = "Hourly VWAP snapshots from a TotalView-ITCH 5.0 feed capture"
)]
struct Cli {
    /// Feed capture to replay; `.gz` files are decompressed on the fly
    feed: PathBuf,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Report rendering
    #[arg(long, value_enum, default_value = "table")]
    format: Format,

    /// Trading-session open
    #[arg(long, value_name = "HH:MM", default_value = "09:30", value_parser = parse_wall_clock)]
    open: u64,

    /// Trading-session close
    #[arg(long, value_name = "HH:MM", default_value = "16:00", value_parser = parse_wall_clock)]
    close: u64,

    /// Log a progress line every N messages (0 disables)
    #[arg(long, value_name = "N", default_value_t = 10_000_000)]
    progress_interval: u64,

    /// Diagnostics retained in the report before overflow counting
    #[arg(long, value_name = "N", default_value_t = 1_000)]
    max_diagnostics: usize,
}

fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    run(Cli::parse())
}

fn run(cli: Cli) -> Result<(), anyhow::Error> {
    if cli.open >= cli.close {
        bail!("session close must be after session open");
    }

    info!(
        version = vwap_engine::SERVICE_VERSION,
        feed = %cli.feed.display(),
        "Starting VWAP report"
    );

    let source = source::open_feed(&cli.feed)?;
    let config = DriverConfig {
        window: SessionWindow {
            market_open_ns: cli.open,
            market_close_ns: cli.close,
        },
        progress_interval: cli.progress_interval,
        max_diagnostics: cli.max_diagnostics,
    };
    let report = SessionDriver::new(config).run(source)?;

    sink::write_report(&report, cli.output.as_deref(), cli.format)
}

/// Parse an `HH:MM` wall-clock time into nanoseconds since midnight.
fn parse_wall_clock(src: &str) -> Result<u64, String> {
    let (hours, minutes) = src
        .split_once(':')
        .ok_or_else(|| format!("expected HH:MM, got '{}'", src))?;
    let hours: u64 = hours
        .parse()
        .map_err(|_| format!("bad hour in '{}'", src))?;
    let minutes: u64 = minutes
        .parse()
        .map_err(|_| format!("bad minute in '{}'", src))?;
    if hours > 23 || minutes > 59 {
        return Err(format!("'{}' is not a wall-clock time", src));
    }
    Ok(hours * NANOS_PER_HOUR + minutes * NANOS_PER_MIN)
}
