/// Scrape pipeline: strategies, retries, extraction and mock fallback.
///
/// One run is:
/// 1. up to `retry.max_retries + 1` attempts
/// 2. within an attempt, each strategy in priority order until one
///    returns content the extractor can turn into readings
/// 3. a `retry.backoff_secs` pause between attempts
/// 4. mock readings once every attempt is exhausted (when enabled)
///
/// Strategy failures never abort the run; they are logged and recorded in
/// the outcome so a caller can report which transports are dying.

use chrono::{Local, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::acquire::{build_strategies, Fetcher};
use crate::config::ScraperConfig;
use crate::extract::extract_readings;
use crate::mock::generate_mock;
use crate::model::{Reading, ScrapeError, Source};

/// File the last fetched page is written to, inside the output directory.
pub const DEBUG_PAGE_FILE: &str = "debug_page.html";

/// One strategy failure within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub attempt: u32,
    pub strategy: String,
    pub error: String,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub readings: Vec<Reading>,
    pub source: Source,
    /// Attempt that produced the readings (the last attempt for mock data).
    pub attempts: u32,
    pub failures: Vec<StrategyFailure>,
}

pub struct Pipeline {
    config: ScraperConfig,
    fetchers: Vec<Box<dyn Fetcher>>,
}

impl Pipeline {
    /// Builds the pipeline with the strategies named in `config`.
    pub fn new(config: ScraperConfig) -> Self {
        let fetchers = build_strategies(&config);
        Self { config, fetchers }
    }

    /// Builds the pipeline with caller-supplied fetchers.
    pub fn with_fetchers(config: ScraperConfig, fetchers: Vec<Box<dyn Fetcher>>) -> Self {
        Self { config, fetchers }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.fetchers.iter().map(|f| f.name()).collect()
    }

    /// Runs the pipeline to completion.
    ///
    /// # Errors
    /// `ScrapeError::AllStrategiesFailed` when nothing produced readings and
    /// mock data is disabled.
    pub fn run(&mut self) -> Result<RunOutcome, ScrapeError> {
        let total = self.config.retry.max_retries.saturating_add(1);
        let backoff = Duration::from_secs(self.config.retry.backoff_secs);
        let mut failures = Vec::new();

        info!(
            strategies = self.fetchers.len(),
            attempts = total,
            "starting water level scrape"
        );

        for attempt in 1..=total {
            info!(attempt, total, "scrape attempt");

            if let Some((strategy, readings)) = self.attempt(attempt, &mut failures) {
                info!(
                    attempt,
                    strategy = %strategy,
                    count = readings.len(),
                    "successfully scraped water level data"
                );
                return Ok(RunOutcome {
                    readings,
                    source: Source::Live { strategy },
                    attempts: attempt,
                    failures,
                });
            }

            if attempt < total && !backoff.is_zero() {
                info!(secs = backoff.as_secs(), "retrying after backoff");
                std::thread::sleep(backoff);
            }
        }

        error!(attempts = total, "all scrape attempts failed");

        if !self.config.mock.enabled {
            return Err(ScrapeError::AllStrategiesFailed { attempts: total });
        }

        let readings = generate_mock(&self.config.mock, now());
        Ok(RunOutcome { readings, source: Source::Mock, attempts: total, failures })
    }

    /// Tries each strategy once; returns the first strategy that yielded readings.
    fn attempt(
        &self,
        attempt: u32,
        failures: &mut Vec<StrategyFailure>,
    ) -> Option<(String, Vec<Reading>)> {
        for fetcher in &self.fetchers {
            let strategy = fetcher.name().to_string();
            info!(attempt, strategy = %strategy, "trying strategy");

            let result = fetcher.fetch().and_then(|html| {
                self.dump_debug_page(&html);
                extract_readings(&html, &self.config.locator, now())
            });

            match result {
                Ok(extraction) => return Some((strategy, extraction.readings)),
                Err(e) => {
                    warn!(attempt, strategy = %strategy, error = %e, "strategy failed");
                    failures.push(StrategyFailure { attempt, strategy, error: e.to_string() });
                }
            }
        }
        None
    }

    /// Saves fetched HTML for offline inspection; failures are only logged.
    fn dump_debug_page(&self, html: &str) {
        if !self.config.output.debug_html {
            return;
        }
        match write_debug_page(&self.config.output.dir, html) {
            Ok(path) => info!(path = %path.display(), "saved page content for debugging"),
            Err(e) => warn!(error = %e, "could not save debug page"),
        }
    }
}

fn write_debug_page(dir: &Path, html: &str) -> Result<PathBuf, ScrapeError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(DEBUG_PAGE_FILE);
    fs::write(&path, html)?;
    Ok(path)
}

/// Extracts readings from a saved page instead of fetching one.
pub fn extract_file(path: &Path, config: &ScraperConfig) -> Result<Vec<Reading>, ScrapeError> {
    let html = fs::read_to_string(path)?;
    info!(path = %path.display(), bytes = html.len(), "extracting from saved page");
    Ok(extract_readings(&html, &config.locator, now())?.readings)
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
