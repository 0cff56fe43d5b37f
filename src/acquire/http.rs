/// reqwest-based acquisition strategies.
///
/// - `DirectFetcher`: a plain GET with client defaults.
/// - `SpoofedHeadersFetcher`: the full desktop-browser header set, retried
///   once per alternate user agent.
/// - `PinnedAddressFetcher`: resolves the site's host name to a known
///   address, for runners whose DNS cannot see the site. The URL and the
///   Host header stay unchanged so TLS still validates against the name.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::{info, warn};

use super::{accept, Fetcher};
use crate::config::{HeaderPair, ScraperConfig};
use crate::model::ScrapeError;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Converts configured header pairs to a reqwest header map.
///
/// `user_agent` replaces whatever User-Agent the pairs carry.
pub fn header_map(headers: &[HeaderPair], user_agent: Option<&str>) -> Result<HeaderMap, ScrapeError> {
    let mut map = HeaderMap::new();

    for pair in headers {
        let name = HeaderName::from_bytes(pair.name.as_bytes())
            .map_err(|e| ScrapeError::Config(format!("invalid header name '{}': {}", pair.name, e)))?;
        let value = HeaderValue::from_str(&pair.value)
            .map_err(|e| ScrapeError::Config(format!("invalid header value for '{}': {}", pair.name, e)))?;
        map.insert(name, value);
    }

    if let Some(ua) = user_agent {
        let value = HeaderValue::from_str(ua)
            .map_err(|e| ScrapeError::Config(format!("invalid user agent '{}': {}", ua, e)))?;
        map.insert(USER_AGENT, value);
    }

    Ok(map)
}

/// GETs `url` and returns the body if the status is 2xx and the content
/// looks like the sensor page.
pub fn get_page(client: &Client, url: &str) -> Result<String, ScrapeError> {
    let response = client.get(url).send()?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::HttpStatus(status.as_u16()));
    }

    accept(response.text()?)
}

// ---------------------------------------------------------------------------
// Direct
// ---------------------------------------------------------------------------

pub struct DirectFetcher {
    url: String,
    timeout: Duration,
}

impl DirectFetcher {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            url: config.target.url.clone(),
            timeout: Duration::from_secs(config.target.timeout_secs),
        }
    }
}

impl Fetcher for DirectFetcher {
    fn name(&self) -> &str {
        "direct"
    }

    fn fetch(&self) -> Result<String, ScrapeError> {
        info!(url = %self.url, "sending plain request");
        let client = Client::builder().timeout(self.timeout).build()?;
        get_page(&client, &self.url)
    }
}

// ---------------------------------------------------------------------------
// Spoofed browser headers
// ---------------------------------------------------------------------------

pub struct SpoofedHeadersFetcher {
    url: String,
    timeout: Duration,
    headers: Vec<HeaderPair>,
    /// `None` keeps the header set's own agent; tried first.
    user_agents: Vec<Option<String>>,
}

impl SpoofedHeadersFetcher {
    pub fn new(config: &ScraperConfig) -> Self {
        let mut user_agents = vec![None];
        user_agents.extend(config.user_agents.iter().cloned().map(Some));

        Self {
            url: config.target.url.clone(),
            timeout: Duration::from_secs(config.target.timeout_secs),
            headers: config.headers.clone(),
            user_agents,
        }
    }

    fn fetch_with(&self, user_agent: Option<&str>) -> Result<String, ScrapeError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .default_headers(header_map(&self.headers, user_agent)?)
            .build()?;
        get_page(&client, &self.url)
    }
}

impl Fetcher for SpoofedHeadersFetcher {
    fn name(&self) -> &str {
        "spoofed_headers"
    }

    fn fetch(&self) -> Result<String, ScrapeError> {
        let mut last_error = ScrapeError::UnusableContent;

        for (i, ua) in self.user_agents.iter().enumerate() {
            info!(
                agent = i + 1,
                total = self.user_agents.len(),
                "sending request with browser headers"
            );
            match self.fetch_with(ua.as_deref()) {
                Ok(content) => return Ok(content),
                Err(e) => {
                    warn!(agent = i + 1, error = %e, "spoofed request failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

// ---------------------------------------------------------------------------
// Pinned address
// ---------------------------------------------------------------------------

pub struct PinnedAddressFetcher {
    url: String,
    timeout: Duration,
    headers: Vec<HeaderPair>,
    host_ip: Option<String>,
}

impl PinnedAddressFetcher {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            url: config.target.url.clone(),
            timeout: Duration::from_secs(config.target.timeout_secs),
            headers: config.headers.clone(),
            host_ip: config.target.host_ip.clone(),
        }
    }

    /// Host name and socket address the host should resolve to.
    fn pin(&self) -> Result<(String, SocketAddr), ScrapeError> {
        let ip_text = self
            .host_ip
            .as_deref()
            .ok_or_else(|| ScrapeError::StrategyUnavailable("no target.host_ip configured".to_string()))?;
        let ip: IpAddr = ip_text
            .parse()
            .map_err(|e| ScrapeError::Config(format!("invalid target.host_ip '{}': {}", ip_text, e)))?;

        let url = reqwest::Url::parse(&self.url)
            .map_err(|e| ScrapeError::Config(format!("invalid target.url '{}': {}", self.url, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| ScrapeError::Config(format!("target.url '{}' has no host", self.url)))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(443);

        Ok((host, SocketAddr::new(ip, port)))
    }
}

impl Fetcher for PinnedAddressFetcher {
    fn name(&self) -> &str {
        "pinned_address"
    }

    fn fetch(&self) -> Result<String, ScrapeError> {
        let (host, addr) = self.pin()?;
        info!(host = %host, address = %addr, "sending request to pinned address");

        let client = Client::builder()
            .timeout(self.timeout)
            .default_headers(header_map(&self.headers, None)?)
            .resolve(&host, addr)
            .build()?;
        get_page(&client, &self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map_carries_configured_headers() {
        let config = ScraperConfig::default();
        let map = header_map(&config.headers, None).expect("default headers are valid");

        assert_eq!(map.get("referer").and_then(|v| v.to_str().ok()), Some("https://www.google.com/"));
        assert!(map.get(USER_AGENT).is_some());
        assert!(map.get("accept-encoding").is_none(), "encoding is negotiated by the client");
    }

    #[test]
    fn test_header_map_user_agent_override() {
        let config = ScraperConfig::default();
        let map = header_map(&config.headers, Some("TestAgent/1.0")).expect("valid headers");
        assert_eq!(map.get(USER_AGENT).and_then(|v| v.to_str().ok()), Some("TestAgent/1.0"));
    }

    #[test]
    fn test_header_map_rejects_invalid_name() {
        let headers = vec![HeaderPair { name: "Bad Header".to_string(), value: "x".to_string() }];
        assert!(matches!(header_map(&headers, None), Err(ScrapeError::Config(_))));
    }

    #[test]
    fn test_spoofed_fetcher_tries_own_agent_first() {
        let config = ScraperConfig::default();
        let fetcher = SpoofedHeadersFetcher::new(&config);
        assert_eq!(fetcher.user_agents.len(), config.user_agents.len() + 1);
        assert!(fetcher.user_agents[0].is_none());
    }

    #[test]
    fn test_pin_uses_host_and_default_port() {
        let config = ScraperConfig::default();
        let (host, addr) = PinnedAddressFetcher::new(&config).pin().expect("default pin is valid");
        assert_eq!(host, "vmc.gov.in");
        assert_eq!(addr, "136.233.132.36:443".parse().unwrap());
    }

    #[test]
    fn test_pin_without_address_is_unavailable() {
        let mut config = ScraperConfig::default();
        config.target.host_ip = None;
        let result = PinnedAddressFetcher::new(&config).fetch();
        assert!(matches!(result, Err(ScrapeError::StrategyUnavailable(_))));
    }

    #[test]
    fn test_pin_rejects_malformed_address() {
        let mut config = ScraperConfig::default();
        config.target.host_ip = Some("not-an-ip".to_string());
        let result = PinnedAddressFetcher::new(&config).pin();
        assert!(matches!(result, Err(ScrapeError::Config(_))));
    }
}
