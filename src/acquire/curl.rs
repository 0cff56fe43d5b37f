/// curl-based acquisition.
///
/// Some hosts treat curl's TLS fingerprint differently from rustls, so the
/// system curl binary is kept as a separate transport. Timeouts are
/// enforced by curl itself (`--connect-timeout`, `--max-time`).

use std::process::Command;
use tracing::{info, warn};

use super::{accept, Fetcher};
use crate::config::{HeaderPair, ScraperConfig};
use crate::model::ScrapeError;

pub struct CurlFetcher {
    binary: String,
    url: String,
    headers: Vec<HeaderPair>,
    connect_timeout_secs: u64,
    max_time_secs: u64,
    /// `host:port:ip` for `--resolve`, when address pinning is on.
    resolve: Option<String>,
}

impl CurlFetcher {
    pub fn new(config: &ScraperConfig) -> Self {
        let resolve = if config.curl.pin_address {
            resolve_spec(&config.target.url, config.target.host_ip.as_deref())
        } else {
            None
        };

        Self {
            binary: config.curl.binary.clone(),
            url: config.target.url.clone(),
            headers: config.headers.clone(),
            connect_timeout_secs: config.curl.connect_timeout_secs,
            max_time_secs: config.curl.max_time_secs,
            resolve,
        }
    }

    /// Arguments passed to curl, URL last.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-L".to_string(),
            "-s".to_string(),
            "-S".to_string(),
            "--connect-timeout".to_string(),
            self.connect_timeout_secs.to_string(),
            "--max-time".to_string(),
            self.max_time_secs.to_string(),
        ];

        if let Some(spec) = &self.resolve {
            args.push("--resolve".to_string());
            args.push(spec.clone());
        }

        for h in &self.headers {
            args.push("-H".to_string());
            args.push(format!("{}: {}", h.name, h.value));
        }

        args.push(self.url.clone());
        args
    }
}

/// Builds curl's `host:port:address` pin for the target URL.
fn resolve_spec(url: &str, host_ip: Option<&str>) -> Option<String> {
    let ip = host_ip?;
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let port = parsed.port_or_known_default()?;
    Some(format!("{}:{}:{}", host, port, ip))
}

impl Fetcher for CurlFetcher {
    fn name(&self) -> &str {
        "curl"
    }

    fn fetch(&self) -> Result<String, ScrapeError> {
        info!(binary = %self.binary, pinned = self.resolve.is_some(), "running curl");

        let output = Command::new(&self.binary)
            .args(self.args())
            .output()
            .map_err(|e| ScrapeError::StrategyUnavailable(format!("cannot run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(status = ?output.status.code(), "curl failed");
            return Err(ScrapeError::Command(format!("curl exited with {}: {}", output.status, stderr)));
        }

        accept(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_include_timeouts_headers_and_url_last() {
        let config = ScraperConfig::default();
        let args = CurlFetcher::new(&config).args();

        assert_eq!(&args[..3], &["-L", "-s", "-S"]);
        assert!(args.windows(2).any(|w| w[0] == "--max-time" && w[1] == "60"));
        assert!(args.iter().any(|a| a == "Referer: https://www.google.com/"));
        assert_eq!(args.last().map(String::as_str), Some(config.target.url.as_str()));
        assert!(!args.iter().any(|a| a == "--resolve"), "pinning is off by default");
    }

    #[test]
    fn test_args_with_pinned_address() {
        let mut config = ScraperConfig::default();
        config.curl.pin_address = true;
        let args = CurlFetcher::new(&config).args();

        let pos = args.iter().position(|a| a == "--resolve").expect("--resolve present");
        assert_eq!(args[pos + 1], "vmc.gov.in:443:136.233.132.36");
    }

    #[test]
    fn test_resolve_spec_needs_address() {
        assert_eq!(resolve_spec("https://vmc.gov.in/x", None), None);
        assert_eq!(
            resolve_spec("http://vmc.gov.in/x", Some("10.0.0.1")).as_deref(),
            Some("vmc.gov.in:80:10.0.0.1")
        );
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let mut config = ScraperConfig::default();
        config.curl.binary = "/nonexistent/bin/curl-not-here".to_string();
        let result = CurlFetcher::new(&config).fetch();
        assert!(matches!(result, Err(ScrapeError::StrategyUnavailable(_))));
    }
}
