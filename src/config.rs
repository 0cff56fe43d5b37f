/// Scraper configuration loader - parses scraper.toml
///
/// Separates the target site, header set, relay and proxy lists, and
/// locator keywords from code, so a shifted page or a dead proxy can be
/// handled by editing the file instead of recompiling.
///
/// Every field has a default matching the production setup, so the file
/// is optional and may be partial.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::acquire::StrategyKind;
use crate::model::ScrapeError;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "scraper.toml";

/// Environment variable naming an alternate configuration file.
pub const CONFIG_PATH_ENV: &str = "VMC_SCRAPER_CONFIG";

const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Configuration structures
// ---------------------------------------------------------------------------

/// Root configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub target: TargetConfig,
    /// Browser-like request headers, sent in this order.
    pub headers: Vec<HeaderPair>,
    /// Alternate user agents tried by the spoofed-header strategy.
    pub user_agents: Vec<String>,
    /// Acquisition strategies in priority order.
    pub strategies: Vec<StrategyKind>,
    pub relays: Vec<RelayConfig>,
    pub proxies: ProxyConfig,
    pub curl: CurlConfig,
    pub browser: BrowserConfig,
    pub locator: LocatorConfig,
    pub retry: RetryConfig,
    pub output: OutputConfig,
    pub mock: MockConfig,
}

/// The page being scraped
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub url: String,
    /// Known-good address of the site, used when DNS for the host fails.
    pub host_ip: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeaderPair {
    pub name: String,
    pub value: String,
}

/// A public CORS/relay endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub name: String,
    /// Request URL with a `{url}` placeholder for the encoded target.
    pub template: String,
    #[serde(default)]
    pub mode: RelayMode,
}

/// How a relay hands back the page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayMode {
    /// Body is the page itself.
    #[default]
    Raw,
    /// Body is a JSON object with the page under `contents`.
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// `host:port` entries, optionally with a scheme.
    pub list: Vec<String>,
    pub shuffle: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CurlConfig {
    pub binary: String,
    pub connect_timeout_secs: u64,
    pub max_time_secs: u64,
    /// Resolve the target host to `target.host_ip` via `--resolve`.
    pub pin_address: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub enabled: bool,
    pub chrome_path: Option<PathBuf>,
    /// Fixed wait after navigation before inspecting the page.
    pub settle_secs: u64,
    /// How long to poll for the table id before taking the page as-is.
    pub wait_secs: u64,
    pub page_load_timeout_secs: u64,
    /// Proxy for `browser_proxy`; falls back to the first list proxy.
    pub proxy: Option<String>,
}

/// Table locator heuristics
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub table_id: String,
    pub class_keywords: Vec<String>,
    pub content_keyword: String,
    /// A table must have strictly more rows than this for the size rule.
    pub min_rows: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra whole-pipeline passes after the first one.
    pub max_retries: u32,
    pub backoff_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub prefix: String,
    /// Save the last fetched page next to the snapshots.
    pub debug_html: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    pub enabled: bool,
    pub locations: Vec<String>,
    pub max_level_ft: f64,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            headers: default_headers(),
            user_agents: vec![
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                    .to_string(),
                "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
                    .to_string(),
            ],
            strategies: StrategyKind::ALL.to_vec(),
            relays: vec![
                RelayConfig {
                    name: "allorigins".to_string(),
                    template: "https://api.allorigins.win/get?url={url}".to_string(),
                    mode: RelayMode::Json,
                },
                RelayConfig {
                    name: "corsproxy".to_string(),
                    template: "https://corsproxy.io/?url={url}".to_string(),
                    mode: RelayMode::Raw,
                },
                RelayConfig {
                    name: "codetabs".to_string(),
                    template: "https://api.codetabs.com/v1/proxy?quest={url}".to_string(),
                    mode: RelayMode::Raw,
                },
            ],
            proxies: ProxyConfig::default(),
            curl: CurlConfig::default(),
            browser: BrowserConfig::default(),
            locator: LocatorConfig::default(),
            retry: RetryConfig::default(),
            output: OutputConfig::default(),
            mock: MockConfig::default(),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: "https://vmc.gov.in/waterlevelsensor/WaterLevel.aspx".to_string(),
            host_ip: Some("136.233.132.36".to_string()),
            timeout_secs: 30,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            list: vec![
                "103.155.217.29:80".to_string(),
                "139.59.67.6:8080".to_string(),
                "139.59.16.235:3128".to_string(),
                "164.52.24.179:80".to_string(),
                "103.250.172.46:8080".to_string(),
            ],
            shuffle: true,
        }
    }
}

impl Default for CurlConfig {
    fn default() -> Self {
        Self {
            binary: "curl".to_string(),
            connect_timeout_secs: 30,
            max_time_secs: 60,
            pin_address: false,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chrome_path: None,
            settle_secs: 5,
            wait_secs: 30,
            page_load_timeout_secs: 60,
            proxy: None,
        }
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            table_id: "GridView1".to_string(),
            class_keywords: vec!["grid".to_string(), "table".to_string()],
            content_keyword: "water level".to_string(),
            min_rows: 5,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 2, backoff_secs: 10 }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            prefix: "water_level_data".to_string(),
            debug_html: true,
        }
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            locations: [
                "AJWA DAM",
                "AKOTA BRIDGE",
                "ASOJ FEEDER",
                "BAHUCHARAJI BRIDGE",
                "KALA GHODA",
                "MANGAL PANDEY BRIDGE",
                "MUJMAUDA BRIDGE",
                "PRATAPPURA DAM",
                "SAMA HARNI BRIDGE",
                "VADSAR BRIDGE",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_level_ft: 250.0,
        }
    }
}

/// Header set copied from a desktop Chrome session that the site accepted.
///
/// Accept-Encoding and hop-by-hop headers are left to the client so the
/// body arrives decoded.
fn default_headers() -> Vec<HeaderPair> {
    [
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Cache-Control", "max-age=0"),
        ("Referer", "https://www.google.com/"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "cross-site"),
        ("Sec-Fetch-User", "?1"),
        ("Upgrade-Insecure-Requests", "1"),
        ("User-Agent", CHROME_UA),
        ("sec-ch-ua", r#""Not;A=Brand";v="99", "Google Chrome";v="139", "Chromium";v="139""#),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", r#""Windows""#),
    ]
    .iter()
    .map(|(name, value)| HeaderPair { name: name.to_string(), value: value.to_string() })
    .collect()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ScraperConfig {
    /// Parses a configuration document; absent fields keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ScrapeError> {
        let config: ScraperConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make every run fail in the same way.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.target.url.trim().is_empty() {
            return Err(ScrapeError::Config("target.url must not be empty".to_string()));
        }
        if self.strategies.is_empty() {
            return Err(ScrapeError::Config("at least one strategy must be listed".to_string()));
        }
        if let Some(relay) = self.relays.iter().find(|r| !r.template.contains("{url}")) {
            return Err(ScrapeError::Config(format!(
                "relay '{}' template has no {{url}} placeholder",
                relay.name
            )));
        }
        if !self.mock.max_level_ft.is_finite() || self.mock.max_level_ft <= 0.0 {
            return Err(ScrapeError::Config(format!(
                "mock.max_level_ft must be a positive finite number, got {}",
                self.mock.max_level_ft
            )));
        }
        Ok(())
    }

    /// The User-Agent value from the header set, if one is configured.
    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("user-agent"))
            .map(|h| h.value.as_str())
    }

    /// Host name of the target URL.
    pub fn target_host(&self) -> Option<String> {
        reqwest::Url::parse(&self.target.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }

    /// Applies `VMC_*` and CI overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary key lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("VMC_OUTPUT_DIR").filter(|v| !v.is_empty()) {
            self.output.dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("VMC_TARGET_URL").filter(|v| !v.is_empty()) {
            self.target.url = url;
        }
        if let Some(path) = lookup("VMC_CHROME_PATH").filter(|v| !v.is_empty()) {
            self.browser.chrome_path = Some(PathBuf::from(path));
        }
        // CI runners keep only the snapshot
        if lookup("GITHUB_ACTIONS").as_deref() == Some("true") {
            self.output.debug_html = false;
        }
    }
}

/// Loads the scraper configuration.
///
/// Resolution order: the explicit `path`, then `$VMC_SCRAPER_CONFIG`, then
/// `scraper.toml` in the working directory. An explicitly named file must
/// exist; the implicit default may be absent, in which case built-in
/// defaults are used. A `.env` file is loaded first and environment
/// overrides are applied last.
pub fn load_config(path: Option<&Path>) -> Result<ScraperConfig, ScrapeError> {
    dotenv::dotenv().ok();

    let explicit = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

    let mut config = match explicit {
        Some(p) => {
            let contents = fs::read_to_string(&p).map_err(|e| {
                ScrapeError::Config(format!("failed to read {}: {}", p.display(), e))
            })?;
            ScraperConfig::from_toml_str(&contents)?
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            let contents = fs::read_to_string(DEFAULT_CONFIG_PATH)?;
            ScraperConfig::from_toml_str(&contents)?
        }
        None => ScraperConfig::default(),
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
