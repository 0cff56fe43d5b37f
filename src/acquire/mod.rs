/// Page acquisition strategies.
///
/// Each strategy is one independent way of getting the sensor page's HTML.
/// The pipeline walks them in configured order and stops at the first one
/// whose content yields readings.
///
/// Submodules:
/// - `http`    — reqwest-based strategies: direct, spoofed headers, pinned address
/// - `curl`    — shells out to the curl binary with the browser header set
/// - `relay`   — public CORS/relay endpoints (raw or JSON-wrapped payloads)
/// - `proxy`   — rotating list of third-party HTTP proxies
/// - `browser` — headless Chromium rendering, optionally through a proxy

pub mod browser;
pub mod curl;
pub mod http;
pub mod proxy;
pub mod relay;

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::config::ScraperConfig;
use crate::model::ScrapeError;

// ---------------------------------------------------------------------------
// Strategy kinds
// ---------------------------------------------------------------------------

/// Names used for strategies in configuration and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Direct,
    SpoofedHeaders,
    PinnedAddress,
    Curl,
    Relay,
    ProxyList,
    Browser,
    BrowserProxy,
}

impl StrategyKind {
    /// Default priority order: cheapest and most likely to work first.
    pub const ALL: [StrategyKind; 8] = [
        StrategyKind::Direct,
        StrategyKind::SpoofedHeaders,
        StrategyKind::PinnedAddress,
        StrategyKind::Curl,
        StrategyKind::Relay,
        StrategyKind::ProxyList,
        StrategyKind::Browser,
        StrategyKind::BrowserProxy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Direct => "direct",
            StrategyKind::SpoofedHeaders => "spoofed_headers",
            StrategyKind::PinnedAddress => "pinned_address",
            StrategyKind::Curl => "curl",
            StrategyKind::Relay => "relay",
            StrategyKind::ProxyList => "proxy_list",
            StrategyKind::Browser => "browser",
            StrategyKind::BrowserProxy => "browser_proxy",
        }
    }

    pub fn is_browser(&self) -> bool {
        matches!(self, StrategyKind::Browser | StrategyKind::BrowserProxy)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        StrategyKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = StrategyKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown strategy '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

// ---------------------------------------------------------------------------
// Fetcher seam
// ---------------------------------------------------------------------------

/// One way of retrieving the raw page.
pub trait Fetcher {
    /// Short label used in logs and failure reports.
    fn name(&self) -> &str;

    /// Fetches the page, returning its HTML only if it looks usable.
    fn fetch(&self) -> Result<String, ScrapeError>;
}

/// A body is worth parsing if it mentions a table or the reading label.
pub fn looks_useful(content: &str) -> bool {
    let lower = content.to_lowercase();
    lower.contains("<table") || lower.contains("water level")
}

/// Passes usable content through, rejecting anything else.
pub fn accept(content: String) -> Result<String, ScrapeError> {
    if looks_useful(&content) {
        Ok(content)
    } else {
        Err(ScrapeError::UnusableContent)
    }
}

/// Builds the configured strategies in priority order.
///
/// Browser strategies are left out when `browser.enabled` is false.
pub fn build_strategies(config: &ScraperConfig) -> Vec<Box<dyn Fetcher>> {
    let mut fetchers: Vec<Box<dyn Fetcher>> = Vec::new();

    for kind in &config.strategies {
        if kind.is_browser() && !config.browser.enabled {
            debug!(strategy = %kind, "browser disabled in config, skipping");
            continue;
        }

        let fetcher: Box<dyn Fetcher> = match kind {
            StrategyKind::Direct => Box::new(http::DirectFetcher::new(config)),
            StrategyKind::SpoofedHeaders => Box::new(http::SpoofedHeadersFetcher::new(config)),
            StrategyKind::PinnedAddress => Box::new(http::PinnedAddressFetcher::new(config)),
            StrategyKind::Curl => Box::new(curl::CurlFetcher::new(config)),
            StrategyKind::Relay => Box::new(relay::RelayFetcher::new(config)),
            StrategyKind::ProxyList => Box::new(proxy::ProxyListFetcher::new(config)),
            StrategyKind::Browser => Box::new(browser::BrowserFetcher::direct(config)),
            StrategyKind::BrowserProxy => {
                let proxy = config
                    .browser
                    .proxy
                    .clone()
                    .or_else(|| config.proxies.list.first().cloned());
                Box::new(browser::BrowserFetcher::proxied(config, proxy))
            }
        };
        fetchers.push(fetcher);
    }

    fetchers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_useful_accepts_tables_and_keyword() {
        assert!(looks_useful("<html><TABLE id='x'></TABLE></html>"));
        assert!(looks_useful("Current Water Level readings"));
        assert!(!looks_useful("<html><body>Access denied</body></html>"));
        assert!(!looks_useful(""));
    }

    #[test]
    fn test_accept_rejects_block_pages() {
        let result = accept("<html>Forbidden</html>".to_string());
        assert!(matches!(result, Err(ScrapeError::UnusableContent)));
        assert!(accept("<table></table>".to_string()).is_ok());
    }

    #[test]
    fn test_strategy_kind_parsing() {
        assert_eq!("direct".parse::<StrategyKind>(), Ok(StrategyKind::Direct));
        assert_eq!("proxy-list".parse::<StrategyKind>(), Ok(StrategyKind::ProxyList));
        assert_eq!("Browser_Proxy".parse::<StrategyKind>(), Ok(StrategyKind::BrowserProxy));

        let err = "telnet".parse::<StrategyKind>().unwrap_err();
        assert!(err.contains("spoofed_headers"), "error should list known strategies: {}", err);
    }

    #[test]
    fn test_strategy_names_round_trip_through_display() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.to_string().parse::<StrategyKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_build_strategies_preserves_order() {
        let mut config = ScraperConfig::default();
        config.strategies = vec![StrategyKind::Relay, StrategyKind::Direct, StrategyKind::Curl];

        let names: Vec<String> = build_strategies(&config)
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(names, vec!["relay", "direct", "curl"]);
    }

    #[test]
    fn test_browser_proxy_keeps_its_name_without_a_proxy() {
        let mut config = ScraperConfig::default();
        config.strategies = vec![StrategyKind::Browser, StrategyKind::BrowserProxy];
        config.proxies.list.clear();
        config.browser.proxy = None;

        let fetchers = build_strategies(&config);
        let names: Vec<&str> = fetchers.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["browser", "browser_proxy"]);
        assert!(matches!(fetchers[1].fetch(), Err(ScrapeError::StrategyUnavailable(_))));
    }

    #[test]
    fn test_build_strategies_skips_browser_when_disabled() {
        let mut config = ScraperConfig::default();
        config.browser.enabled = false;

        let fetchers = build_strategies(&config);
        assert_eq!(fetchers.len(), StrategyKind::ALL.len() - 2);
        assert!(fetchers.iter().all(|f| !f.name().starts_with("browser")));
    }
}
