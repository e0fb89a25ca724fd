use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::FetchError;
use crate::fetch::{DEFAULT_EXPECTED_STATUS, Fetcher};

/// Declarative description of a [`Fetcher`].
///
/// Stored as a JSON object:
/// ```json
/// {
///   "location": "https://example.test/data.csv",
///   "expected_status": 200,
///   "headers": { "Accept": "text/csv" },
///   "basic_auth": { "user": "reader", "password": "..." },
///   "bearer_token": "...",
///   "proxy": "socks5://127.0.0.1:1080"
/// }
/// ```
/// Only `location` is required. Values are used exactly as written.
///
/// This is a convenience for host applications. Credentials and the proxy
/// address come in already sourced, and nothing here reads the environment
/// or a secret store. Hosts that manage secrets differently can skip this
/// type and call the [`Fetcher`] setters directly.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetcherConfig {
    pub location: String,
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
}

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Debug for FetcherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetcherConfig")
            .field("location", &self.location)
            .field("expected_status", &self.expected_status)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("basic_auth", &self.basic_auth)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("proxy", &self.proxy)
            .finish()
    }
}

fn default_expected_status() -> u16 {
    DEFAULT_EXPECTED_STATUS
}

impl FetcherConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("failed to read fetcher config '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("invalid fetcher config '{path}'"))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the described [`Fetcher`].
    ///
    /// Headers are applied first, then basic auth, then the bearer token, so
    /// a bearer token wins over both.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidRequest`] if the location is malformed or
    /// the proxy is not a URL.
    pub fn build(&self) -> Result<Fetcher, FetchError> {
        let mut fetcher = Fetcher::new(&self.location)?;

        for (name, value) in &self.headers {
            fetcher.set_header(name, value);
        }
        if let Some(auth) = &self.basic_auth {
            fetcher.set_basic_auth(&auth.user, &auth.password);
        }
        if let Some(token) = &self.bearer_token {
            fetcher.set_bearer_token(token);
        }
        if let Some(proxy) = &self.proxy {
            let proxy = proxy.parse::<Url>().map_err(|e| FetchError::InvalidRequest {
                location: self.location.clone(),
                reason: format!("invalid proxy {proxy:?}: {e}"),
            })?;
            fetcher.set_proxy(&proxy);
        }
        fetcher.set_expected_status(self.expected_status);

        Ok(fetcher)
    }
}
