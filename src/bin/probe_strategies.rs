//! Acquisition Strategy Probe
//!
//! Runs every configured strategy exactly once against the sensor page and
//! reports, per strategy, whether it returned usable content and how many
//! readings the extractor found in it. Nothing is written to disk.
//!
//! Useful when the daily snapshot starts falling back to mock data: it
//! shows which transports still reach the site.
//!
//! Usage:
//!   cargo run --bin probe_strategies
//!   cargo run --bin probe_strategies -- --strategy curl --strategy relay
//!
//! Environment:
//!   RUST_LOG, VMC_SCRAPER_CONFIG, VMC_TARGET_URL, VMC_CHROME_PATH

use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use vmc_waterlevel::acquire::{build_strategies, StrategyKind};
use vmc_waterlevel::config::load_config;
use vmc_waterlevel::extract::extract_readings;

#[derive(Parser)]
#[command(name = "probe_strategies", about = "Try each acquisition strategy once and report")]
struct Cli {
    /// Configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only probe these strategies.
    #[arg(long = "strategy", value_name = "KIND")]
    strategies: Vec<StrategyKind>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if !cli.strategies.is_empty() {
        config.strategies = cli.strategies.clone();
    }

    println!("Probing {}", config.target.url);
    println!("{:<16} {:<8} {:>8} {:>9}  detail", "strategy", "content", "readings", "elapsed");

    let mut working = 0;
    for fetcher in build_strategies(&config) {
        let started = Instant::now();
        let fetched = fetcher.fetch();
        let elapsed = started.elapsed().as_secs_f64();

        let (content, readings, detail) = match fetched {
            Ok(html) => match extract_readings(&html, &config.locator, Local::now().naive_local()) {
                Ok(extraction) => {
                    working += 1;
                    ("yes", extraction.readings.len(), format!("table by {}", extraction.method))
                }
                Err(e) => ("yes", 0, e.to_string()),
            },
            Err(e) => ("no", 0, e.to_string()),
        };

        println!(
            "{:<16} {:<8} {:>8} {:>8.1}s  {}",
            fetcher.name(),
            content,
            readings,
            elapsed,
            detail
        );
    }

    println!("\n{} strategy(ies) produced readings", working);
    if working > 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
