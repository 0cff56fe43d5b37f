//! VMC Water Level Scraper - main entry point
//!
//! Fetches the Vadodara water-level sensor table once, trying every
//! configured acquisition strategy, and writes the readings to a dated CSV
//! snapshot. Falls back to mock readings when the site is unreachable
//! (unless `--no-mock`).
//!
//! Usage:
//!   cargo run --release                               # full run with scraper.toml / defaults
//!   cargo run --release -- --strategy relay --retries 0
//!   cargo run --release -- --from-file data/debug_page.html
//!
//! Environment:
//!   RUST_LOG            - log filter (default: info)
//!   VMC_SCRAPER_CONFIG  - alternate config file
//!   VMC_OUTPUT_DIR      - output directory override
//!   VMC_TARGET_URL      - sensor page override
//!   VMC_CHROME_PATH     - Chromium binary for the browser strategies
//!   GITHUB_ACTIONS=true - disables the debug page dump

use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use vmc_waterlevel::acquire::StrategyKind;
use vmc_waterlevel::config::{load_config, ScraperConfig};
use vmc_waterlevel::model::{Reading, ScrapeError, Source};
use vmc_waterlevel::pipeline::{extract_file, Pipeline};
use vmc_waterlevel::snapshot::write_snapshot;

#[derive(Parser)]
#[command(
    name = "vmc_waterlevel",
    about = "Scrape the VMC water level sensor table into a dated CSV snapshot",
    version
)]
struct Cli {
    /// Configuration file (default: $VMC_SCRAPER_CONFIG or ./scraper.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the snapshot and debug page.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Strategy to use, in order; repeat to list several (replaces the configured list).
    #[arg(long = "strategy", value_name = "KIND")]
    strategies: Vec<StrategyKind>,

    /// Retries after the first attempt.
    #[arg(long)]
    retries: Option<u32>,

    /// Seconds to wait between attempts.
    #[arg(long)]
    backoff: Option<u64>,

    /// Fail instead of writing mock readings.
    #[arg(long)]
    no_mock: bool,

    /// Extract from a saved HTML page instead of fetching.
    #[arg(long, value_name = "HTML")]
    from_file: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut ScraperConfig) {
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if !self.strategies.is_empty() {
            config.strategies = self.strategies.clone();
        }
        if let Some(retries) = self.retries {
            config.retry.max_retries = retries;
        }
        if let Some(backoff) = self.backoff {
            config.retry.backoff_secs = backoff;
        }
        if self.no_mock {
            config.mock.enabled = false;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "scrape failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), ScrapeError> {
    let mut config = load_config(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let (readings, source) = match &cli.from_file {
        Some(path) => (extract_file(path, &config)?, Source::Live { strategy: "file".to_string() }),
        None => {
            let mut pipeline = Pipeline::new(config.clone());
            info!(strategies = ?pipeline.strategy_names(), "configured strategies");
            let outcome = pipeline.run()?;
            for failure in &outcome.failures {
                warn!(
                    attempt = failure.attempt,
                    strategy = %failure.strategy,
                    error = %failure.error,
                    "strategy failure"
                );
            }
            (outcome.readings, outcome.source)
        }
    };

    if source.is_mock() {
        warn!("all scraping attempts failed, saving mock data");
    }

    let path = write_snapshot(
        &readings,
        &config.output.dir,
        &config.output.prefix,
        Local::now().date_naive(),
    )?;
    log_summary(&readings, &source);
    info!(path = %path.display(), "done");
    Ok(())
}

fn log_summary(readings: &[Reading], source: &Source) {
    info!(count = readings.len(), source = %source, "scraping summary");
    for (i, r) in readings.iter().take(3).enumerate() {
        info!(
            row = i + 1,
            location = %r.location,
            level = %r.water_level,
            date_time = %r.date_time,
            "sample"
        );
    }
}
