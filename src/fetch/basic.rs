use super::client::HttpClient;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Proxy, Url};

static SHARED: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// [`HttpClient`] backed by a plain `reqwest::Client`.
///
/// Cloning is cheap and clones share the same connection pool.
#[derive(Clone)]
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    /// The process-wide default transport. Initialised on first use and
    /// shared by every fetcher without a transport override.
    pub fn shared() -> Self {
        Self(SHARED.clone())
    }

    /// A client that connects straight to the target, ignoring any
    /// `HTTP_PROXY`-style environment variables.
    pub fn direct() -> reqwest::Result<Self> {
        Ok(Self(reqwest::Client::builder().no_proxy().build()?))
    }

    /// A client that routes every request through `proxy`.
    ///
    /// Supported schemes are `http`, `https`, `socks5` and `socks5h`.
    pub fn with_proxy(proxy: &Url) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .proxy(Proxy::all(proxy.clone())?)
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
