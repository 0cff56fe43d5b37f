/// Public CORS/relay endpoints.
///
/// A relay fetches the page on our behalf from its own network. Two reply
/// shapes are handled: the raw page, or a JSON envelope with the page under
/// `contents` (allorigins style), which may itself be a base64 `data:` URI
/// when the relay could not decode the upstream charset.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{info, warn};

use super::{accept, Fetcher};
use super::http::header_map;
use crate::config::{RelayConfig, RelayMode, ScraperConfig};
use crate::model::ScrapeError;

pub struct RelayFetcher {
    target: String,
    relays: Vec<RelayConfig>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl RelayFetcher {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            target: config.target.url.clone(),
            relays: config.relays.clone(),
            timeout: Duration::from_secs(config.target.timeout_secs),
            user_agent: config.user_agent().map(str::to_string),
        }
    }

    fn fetch_via(&self, client: &Client, relay: &RelayConfig) -> Result<String, ScrapeError> {
        let url = relay_url(&relay.template, &self.target);
        let fail = |reason: String| ScrapeError::Relay { relay: relay.name.clone(), reason };

        let response = client.get(&url).send().map_err(|e| fail(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("status code {}", status.as_u16())));
        }
        let body = response.text().map_err(|e| fail(e.to_string()))?;

        let page = match relay.mode {
            RelayMode::Raw => body,
            RelayMode::Json => unwrap_json_payload(&body).map_err(fail)?,
        };

        accept(page)
    }
}

/// Substitutes the URL-encoded target into a relay template.
pub fn relay_url(template: &str, target: &str) -> String {
    template.replace("{url}", &urlencoding::encode(target))
}

/// Pulls the page out of a `{"contents": ...}` envelope.
pub fn unwrap_json_payload(body: &str) -> Result<String, String> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| format!("invalid JSON payload: {}", e))?;

    let contents = value
        .get("contents")
        .and_then(|c| c.as_str())
        .ok_or_else(|| "JSON payload has no string 'contents' field".to_string())?;

    match decode_data_uri(contents) {
        Some(decoded) => decoded,
        None => Ok(contents.to_string()),
    }
}

/// Decodes a `data:<mime>;base64,<payload>` URI.
///
/// Returns `None` if `text` is not a base64 data URI at all.
pub fn decode_data_uri(text: &str) -> Option<Result<String, String>> {
    let rest = text.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }

    Some(
        STANDARD
            .decode(payload.trim())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .map_err(|e| format!("invalid base64 payload: {}", e)),
    )
}

impl Fetcher for RelayFetcher {
    fn name(&self) -> &str {
        "relay"
    }

    fn fetch(&self) -> Result<String, ScrapeError> {
        if self.relays.is_empty() {
            return Err(ScrapeError::StrategyUnavailable("no relays configured".to_string()));
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .default_headers(header_map(&[], self.user_agent.as_deref())?)
            .build()?;

        let mut last_error = ScrapeError::UnusableContent;
        for (i, relay) in self.relays.iter().enumerate() {
            info!(relay = %relay.name, index = i + 1, total = self.relays.len(), "trying relay");
            match self.fetch_via(&client, relay) {
                Ok(content) => {
                    info!(relay = %relay.name, "relay returned usable content");
                    return Ok(content);
                }
                Err(e) => {
                    warn!(relay = %relay.name, error = %e, "relay failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
