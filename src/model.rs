/// Shared data types for the water-level scraper.
///
/// A reading is deliberately flat: three strings exactly as they appear on
/// the sensor page. Nothing downstream parses the level or the timestamp,
/// so neither is converted here.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Timestamp formats
// ---------------------------------------------------------------------------

/// Wall-clock stand-in for a missing or unusable date/time cell.
pub const FALLBACK_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp format used for synthetic readings (matches the site's own).
pub const MOCK_DATETIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Date stamp embedded in snapshot file names.
pub const FILE_DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// One row of the published sensor table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Water Level (Feet)")]
    pub water_level: String,
    #[serde(rename = "Date & Time")]
    pub date_time: String,
}

impl Reading {
    pub fn new(
        location: impl Into<String>,
        water_level: impl Into<String>,
        date_time: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            water_level: water_level.into(),
            date_time: date_time.into(),
        }
    }
}

/// Where the readings of a run came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Extracted from content returned by the named strategy.
    Live { strategy: String },
    /// Synthesized because every strategy failed.
    Mock,
}

impl Source {
    pub fn is_mock(&self) -> bool {
        matches!(self, Source::Mock)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Live { strategy } => write!(f, "live ({})", strategy),
            Source::Mock => write!(f, "mock"),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Every failure the scraper can report.
///
/// Acquisition variants are expected and recoverable (the pipeline moves
/// on to the next strategy); only `AllStrategiesFailed`, `Config`, `Io`
/// and `Csv` normally surface to the binary.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed with status code {0}")]
    HttpStatus(u16),

    #[error("response does not contain a table or water level text")]
    UnusableContent,

    #[error("relay {relay} failed: {reason}")]
    Relay { relay: String, reason: String },

    #[error("proxy {proxy} failed: {reason}")]
    Proxy { proxy: String, reason: String },

    #[error("external command failed: {0}")]
    Command(String),

    #[error("headless browser failed: {0}")]
    Browser(String),

    #[error("strategy unavailable: {0}")]
    StrategyUnavailable(String),

    #[error("could not find any suitable table with water level data")]
    TableNotFound,

    #[error("no data rows found in the table")]
    NoDataRows,

    #[error("no readings to save")]
    NoData,

    #[error("all acquisition strategies failed after {attempts} attempt(s)")]
    AllStrategiesFailed { attempts: u32 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
