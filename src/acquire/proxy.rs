/// Rotating third-party HTTP proxies.
///
/// Free proxy lists go stale quickly, so every entry is tried in turn
/// (shuffled by default to spread load) and the first usable page wins.

use rand::seq::SliceRandom;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{info, warn};

use super::Fetcher;
use super::http::{get_page, header_map};
use crate::config::{HeaderPair, ScraperConfig};
use crate::model::ScrapeError;

pub struct ProxyListFetcher {
    target: String,
    proxies: Vec<String>,
    shuffle: bool,
    headers: Vec<HeaderPair>,
    timeout: Duration,
}

impl ProxyListFetcher {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            target: config.target.url.clone(),
            proxies: config.proxies.list.clone(),
            shuffle: config.proxies.shuffle,
            headers: config.headers.clone(),
            timeout: Duration::from_secs(config.target.timeout_secs),
        }
    }

    fn fetch_via(&self, proxy: &str) -> Result<String, ScrapeError> {
        let fail = |reason: String| ScrapeError::Proxy { proxy: proxy.to_string(), reason };

        let proxy_url = normalize_proxy_url(proxy);
        let client = Client::builder()
            .timeout(self.timeout)
            .proxy(reqwest::Proxy::all(&proxy_url).map_err(|e| fail(e.to_string()))?)
            .default_headers(header_map(&self.headers, None)?)
            .build()
            .map_err(|e| fail(e.to_string()))?;

        get_page(&client, &self.target).map_err(|e| match e {
            ScrapeError::UnusableContent => e,
            other => fail(other.to_string()),
        })
    }
}

/// Bare `host:port` entries are taken as plain HTTP proxies.
pub fn normalize_proxy_url(proxy: &str) -> String {
    let proxy = proxy.trim();
    if proxy.contains("://") {
        proxy.to_string()
    } else {
        format!("http://{}", proxy)
    }
}

impl Fetcher for ProxyListFetcher {
    fn name(&self) -> &str {
        "proxy_list"
    }

    fn fetch(&self) -> Result<String, ScrapeError> {
        if self.proxies.is_empty() {
            return Err(ScrapeError::StrategyUnavailable("no proxies configured".to_string()));
        }

        let mut order: Vec<&String> = self.proxies.iter().collect();
        if self.shuffle {
            order.shuffle(&mut rand::thread_rng());
        }

        let mut last_error = ScrapeError::UnusableContent;
        for (i, proxy) in order.iter().enumerate() {
            info!(proxy = %proxy, index = i + 1, total = order.len(), "trying proxy");
            match self.fetch_via(proxy) {
                Ok(content) => {
                    info!(proxy = %proxy, "proxy returned usable content");
                    return Ok(content);
                }
                Err(e) => {
                    warn!(proxy = %proxy, error = %e, "proxy failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_host_port() {
        assert_eq!(normalize_proxy_url("139.59.67.6:8080"), "http://139.59.67.6:8080");
        assert_eq!(normalize_proxy_url(" 10.0.0.1:3128 "), "http://10.0.0.1:3128");
    }

    #[test]
    fn test_normalize_keeps_explicit_scheme() {
        assert_eq!(normalize_proxy_url("socks5://10.0.0.1:1080"), "socks5://10.0.0.1:1080");
        assert_eq!(normalize_proxy_url("https://proxy.example:443"), "https://proxy.example:443");
    }

    #[test]
    fn test_empty_list_is_unavailable() {
        let mut config = ScraperConfig::default();
        config.proxies.list.clear();
        let result = ProxyListFetcher::new(&config).fetch();
        assert!(matches!(result, Err(ScrapeError::StrategyUnavailable(_))));
    }

    #[test]
    fn test_unreachable_proxy_reports_proxy_error() {
        let mut config = ScraperConfig::default();
        config.target.url = "http://127.0.0.1:9/WaterLevel.aspx".to_string();
        config.target.timeout_secs = 2;
        // Port 9 (discard) is closed on test hosts
        config.proxies.list = vec!["127.0.0.1:9".to_string()];

        let result = ProxyListFetcher::new(&config).fetch();
        assert!(
            matches!(result, Err(ScrapeError::Proxy { ref proxy, .. }) if proxy == "127.0.0.1:9"),
            "got {:?}",
            result
        );
    }
}
