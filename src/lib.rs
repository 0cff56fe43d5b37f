/// vmc_waterlevel: Vadodara Municipal Corporation water-level sensor scraper.
///
/// # Module structure
///
/// ```text
/// vmc_waterlevel
/// ├── model       — shared data types (Reading, Source, ScrapeError)
/// ├── config      — scraper configuration loader (scraper.toml + env overrides)
/// ├── acquire
/// │   ├── http    — direct, spoofed-header and pinned-address requests
/// │   ├── curl    — curl subprocess with browser headers
/// │   ├── relay   — public relay endpoints (raw / JSON / data URI payloads)
/// │   ├── proxy   — rotating third-party HTTP proxies
/// │   └── browser — headless Chromium (feature `browser`)
/// ├── extract
/// │   ├── locate  — table locator heuristics and DOM helpers
/// │   └── fixtures (test only) — representative sensor pages
/// ├── mock        — synthetic fallback readings
/// ├── pipeline    — strategy loop, retries, mock fallback
/// └── snapshot    — dated CSV output
/// ```

/// Public modules
pub mod acquire;
pub mod config;
pub mod extract;
pub mod mock;
pub mod model;
pub mod pipeline;
pub mod snapshot;
