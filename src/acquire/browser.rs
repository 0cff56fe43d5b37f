/// Headless Chromium rendering.
///
/// Last-resort transports for when the site only serves the table to a
/// real browser: one launched directly, one launched with
/// `--proxy-server`. The page is given time to settle, the first iframe's
/// document is preferred when readable (the sensor grid has been served
/// framed before), and the table id is polled for before the DOM is taken.
///
/// Requires the `browser` cargo feature. The rest of the crate is
/// blocking, so each fetch runs on its own single-threaded tokio runtime.

use std::path::PathBuf;
use std::time::Duration;

use super::Fetcher;
use crate::config::ScraperConfig;
use crate::model::ScrapeError;

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
pub struct BrowserFetcher {
    label: &'static str,
    url: String,
    chrome_path: Option<PathBuf>,
    table_id: String,
    user_agent: Option<String>,
    proxy: Option<String>,
    settle: Duration,
    wait: Duration,
    page_load_timeout: Duration,
}

impl BrowserFetcher {
    /// Unproxied Chromium, the `browser` strategy.
    pub fn direct(config: &ScraperConfig) -> Self {
        Self::new("browser", config, None)
    }

    /// Chromium behind `--proxy-server`, the `browser_proxy` strategy.
    ///
    /// With no proxy the fetcher keeps its label but reports
    /// `StrategyUnavailable` instead of launching.
    pub fn proxied(config: &ScraperConfig, proxy: Option<String>) -> Self {
        Self::new("browser_proxy", config, proxy)
    }

    fn new(label: &'static str, config: &ScraperConfig, proxy: Option<String>) -> Self {
        Self {
            label,
            url: config.target.url.clone(),
            chrome_path: config.browser.chrome_path.clone(),
            table_id: config.locator.table_id.clone(),
            user_agent: config.user_agent().map(str::to_string),
            proxy: proxy.map(|p| super::proxy::normalize_proxy_url(&p)),
            settle: Duration::from_secs(config.browser.settle_secs),
            wait: Duration::from_secs(config.browser.wait_secs),
            page_load_timeout: Duration::from_secs(config.browser.page_load_timeout_secs),
        }
    }

    /// Command-line switches for the Chromium process.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            "--headless=new".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-extensions".to_string(),
            "--window-size=1920,1080".to_string(),
        ];
        if let Some(ua) = &self.user_agent {
            args.push(format!("--user-agent={}", ua));
        }
        if let Some(proxy) = &self.proxy {
            args.push(format!("--proxy-server={}", proxy));
        }
        args
    }

    fn check_proxy(&self) -> Result<(), ScrapeError> {
        if self.label == "browser_proxy" && self.proxy.is_none() {
            return Err(ScrapeError::StrategyUnavailable(
                "no proxy configured for browser_proxy".to_string(),
            ));
        }
        Ok(())
    }
}

/// Script returning the HTML to parse: the first iframe's document if it
/// is same-origin and loaded, otherwise the top document.
#[cfg(feature = "browser")]
const CAPTURE_SCRIPT: &str = r#"(() => {
  const frame = document.querySelector('iframe');
  try {
    if (frame && frame.contentDocument && frame.contentDocument.documentElement) {
      return frame.contentDocument.documentElement.outerHTML;
    }
  } catch (e) {}
  return document.documentElement.outerHTML;
})()"#;

/// Script testing whether the element `id` exists in the page or its first
/// iframe.
#[cfg(feature = "browser")]
fn presence_script(id: &str) -> String {
    // JSON string literal doubles as a safely quoted JS string
    let quoted = serde_json::to_string(id).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"(() => {{
  const id = {quoted};
  if (document.getElementById(id)) return true;
  const frame = document.querySelector('iframe');
  try {{
    return !!(frame && frame.contentDocument && frame.contentDocument.getElementById(id));
  }} catch (e) {{
    return false;
  }}
}})()"#
    )
}

#[cfg(feature = "browser")]
mod render {
    use super::*;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::page::Page;
    use futures::StreamExt;
    use tracing::{info, warn};

    const POLL_INTERVAL: Duration = Duration::from_millis(500);

    /// Locates a Chromium binary: configured path first, then PATH.
    pub fn find_chromium(configured: Option<&PathBuf>) -> Option<PathBuf> {
        if let Some(p) = configured {
            if p.exists() {
                return Some(p.clone());
            }
        }
        ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"]
            .iter()
            .find_map(|name| which::which(name).ok())
    }

    impl BrowserFetcher {
        pub(super) fn render_blocking(&self) -> Result<String, ScrapeError> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| ScrapeError::Browser(format!("failed to start runtime: {}", e)))?;
            runtime.block_on(self.render())
        }

        async fn render(&self) -> Result<String, ScrapeError> {
            let chrome = find_chromium(self.chrome_path.as_ref()).ok_or_else(|| {
                ScrapeError::StrategyUnavailable("Chromium not found (set VMC_CHROME_PATH)".to_string())
            })?;
            info!(chrome = %chrome.display(), proxy = ?self.proxy, "launching headless browser");

            let mut builder = BrowserConfig::builder()
                .chrome_executable(chrome)
                .request_timeout(self.page_load_timeout);
            for arg in self.launch_args() {
                builder = builder.arg(arg);
            }
            let config = builder
                .build()
                .map_err(|e| ScrapeError::Browser(format!("failed to build browser config: {}", e)))?;

            let (mut browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| ScrapeError::Browser(format!("failed to launch Chromium: {}", e)))?;

            let events = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    let _ = event;
                }
            });

            let result = self.capture(&browser).await;

            if let Err(e) = browser.close().await {
                warn!(error = %e, "browser did not close cleanly");
            }
            let _ = browser.wait().await;
            events.abort();

            result
        }

        async fn capture(&self, browser: &Browser) -> Result<String, ScrapeError> {
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| ScrapeError::Browser(format!("failed to open page: {}", e)))?;

            info!(url = %self.url, "navigating");
            match tokio::time::timeout(self.page_load_timeout, page.goto(self.url.as_str())).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(ScrapeError::Browser(format!("navigation failed: {}", e))),
                Err(_) => warn!("page load timed out, continuing with current page state"),
            }

            tokio::time::sleep(self.settle).await;

            if self.wait_for_table(&page).await {
                info!(table_id = %self.table_id, "table present in rendered page");
            } else {
                warn!(table_id = %self.table_id, "table id never appeared, taking page as-is");
            }

            page.evaluate(CAPTURE_SCRIPT)
                .await
                .map_err(|e| ScrapeError::Browser(format!("failed to read page source: {}", e)))?
                .into_value::<String>()
                .map_err(|e| ScrapeError::Browser(format!("page source was not a string: {}", e)))
        }

        async fn wait_for_table(&self, page: &Page) -> bool {
            let script = presence_script(&self.table_id);
            let deadline = tokio::time::Instant::now() + self.wait;

            loop {
                let present = match page.evaluate(script.as_str()).await {
                    Ok(result) => result.into_value::<bool>().unwrap_or(false),
                    Err(_) => false,
                };
                if present {
                    return true;
                }
                if tokio::time::Instant::now() >= deadline {
                    return false;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }
}

impl Fetcher for BrowserFetcher {
    fn name(&self) -> &str {
        self.label
    }

    #[cfg(feature = "browser")]
    fn fetch(&self) -> Result<String, ScrapeError> {
        self.check_proxy()?;
        let html = self.render_blocking()?;
        super::accept(html)
    }

    #[cfg(not(feature = "browser"))]
    fn fetch(&self) -> Result<String, ScrapeError> {
        self.check_proxy()?;
        Err(ScrapeError::StrategyUnavailable(
            "built without the `browser` feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_reflects_proxy() {
        let config = ScraperConfig::default();
        assert_eq!(BrowserFetcher::direct(&config).name(), "browser");
        assert_eq!(
            BrowserFetcher::proxied(&config, Some("10.0.0.1:8080".to_string())).name(),
            "browser_proxy"
        );
        assert_eq!(BrowserFetcher::proxied(&config, None).name(), "browser_proxy");
    }

    #[test]
    fn test_launch_args_include_agent_and_proxy() {
        let config = ScraperConfig::default();
        let args = BrowserFetcher::proxied(&config, Some("10.0.0.1:8080".to_string())).launch_args();

        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla/5.0")));
        assert!(args.contains(&"--proxy-server=http://10.0.0.1:8080".to_string()));
    }

    #[test]
    fn test_launch_args_without_proxy() {
        let config = ScraperConfig::default();
        let args = BrowserFetcher::direct(&config).launch_args();
        assert!(!args.iter().any(|a| a.starts_with("--proxy-server")));
    }

    #[test]
    fn test_proxied_without_proxy_is_unavailable() {
        let config = ScraperConfig::default();
        let result = BrowserFetcher::proxied(&config, None).fetch();
        assert!(
            matches!(result, Err(ScrapeError::StrategyUnavailable(ref msg)) if msg.contains("browser_proxy")),
            "got {:?}",
            result
        );
    }

    #[cfg(feature = "browser")]
    #[test]
    fn test_presence_script_quotes_id() {
        let script = presence_script("Grid\"View1");
        assert!(script.contains(r#"const id = "Grid\"View1";"#), "{}", script);
    }

    #[cfg(feature = "browser")]
    #[test]
    fn test_missing_configured_chrome_falls_back_to_path_lookup() {
        let bogus = PathBuf::from("/nonexistent/chrome");
        // Only asserts the configured path is not returned when absent
        let found = render::find_chromium(Some(&bogus));
        assert_ne!(found, Some(bogus));
    }
}
