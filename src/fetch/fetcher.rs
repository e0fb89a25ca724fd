use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use reqwest::{Method, Request, Url};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::auth::Credentials;
use super::basic::BasicClient;
use super::body::{ResponseBody, drain_with_excerpt};
use super::client::HttpClient;
use crate::error::{FetchError, TransportFailure};

/// Status treated as success unless overridden.
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;

enum Transport {
    Default,
    Override(Arc<dyn HttpClient>),
    /// A proxy reqwest refused; reported by `open`.
    InvalidProxy { proxy: String, reason: String },
}

/// Opens a `GET` request to one location and hands back its body.
///
/// Configure it with the chained setters, then call [`Fetcher::open`]. The
/// same fetcher can be opened again; every call sends the same request.
///
/// ```no_run
/// # async fn run() -> Result<(), url_reader::FetchError> {
/// use tokio_util::sync::CancellationToken;
/// use url_reader::Fetcher;
///
/// let mut fetcher = Fetcher::new("https://example.test/config.json")?;
/// fetcher.set_bearer_token("token").set_header("Accept", "application/json");
///
/// let body = fetcher.open(&CancellationToken::new()).await?;
/// let bytes = body.bytes().await?;
/// # Ok(())
/// # }
/// ```
pub struct Fetcher {
    location: String,
    url: Url,
    expected_status: u16,
    headers: Vec<(String, String)>,
    transport: Transport,
}

impl Fetcher {
    /// Creates a fetcher for `location`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidRequest`] if `location` is not an absolute
    /// `http` or `https` URL.
    pub fn new(location: &str) -> Result<Self, FetchError> {
        let invalid = |reason: String| FetchError::InvalidRequest {
            location: location.to_string(),
            reason,
        };

        let url = location.parse::<Url>().map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        Ok(Self {
            location: location.to_string(),
            url,
            expected_status: DEFAULT_EXPECTED_STATUS,
            headers: Vec::new(),
            transport: Transport::Default,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn expected_status(&self) -> u16 {
        self.expected_status
    }

    /// Returns the configured value of header `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Sends HTTP Basic credentials, replacing any `Authorization` header.
    pub fn set_basic_auth(&mut self, user: &str, password: &str) -> &mut Self {
        self.set_credentials(&Credentials::basic(user, password))
    }

    /// Sends `Authorization: Bearer <token>`, replacing any `Authorization` header.
    pub fn set_bearer_token(&mut self, token: &str) -> &mut Self {
        self.set_credentials(&Credentials::bearer(token))
    }

    pub fn set_credentials(&mut self, credentials: &Credentials) -> &mut Self {
        self.set_header(AUTHORIZATION.as_str(), &credentials.header_value())
    }

    /// Sets header `name`, overwriting an existing header of the same name.
    ///
    /// Names and values are checked when the request is built, so an invalid
    /// one makes [`Fetcher::open`] fail rather than this call.
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match self.headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(entry) => *entry = (name.to_string(), value.to_string()),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
        self
    }

    /// Routes the request through `proxy` (`socks5`, `http` or `https`),
    /// replacing any earlier proxy or transport.
    pub fn set_proxy(&mut self, proxy: &Url) -> &mut Self {
        self.transport = match BasicClient::with_proxy(proxy) {
            Ok(client) => Transport::Override(Arc::new(client)),
            Err(e) => Transport::InvalidProxy {
                proxy: proxy.to_string(),
                reason: e.to_string(),
            },
        };
        self
    }

    /// Sends the request through `client` instead of the shared default,
    /// replacing any earlier proxy or transport.
    pub fn set_transport(&mut self, client: Arc<dyn HttpClient>) -> &mut Self {
        self.transport = Transport::Override(client);
        self
    }

    /// Overrides the status that counts as success.
    pub fn set_expected_status(&mut self, status: u16) -> &mut Self {
        self.expected_status = status;
        self
    }

    /// Sends the request and returns the open body.
    ///
    /// `cancel` governs the whole exchange: connecting, sending, reading the
    /// response headers and, through the returned [`ResponseBody`], reading
    /// the body. The fetcher sets no deadline of its own, so callers should
    /// cancel the token when their time budget runs out.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Transport`] if the request could not be completed,
    ///   including when `cancel` fires first.
    /// - [`FetchError::UnexpectedStatus`] if the status differs from the
    ///   expected one. The response body has then already been drained and
    ///   released; the error keeps its first [`MAX_EXCERPT`](super::MAX_EXCERPT) bytes.
    #[tracing::instrument(skip_all, fields(location = %self.location))]
    pub async fn open(&self, cancel: &CancellationToken) -> Result<ResponseBody, FetchError> {
        let client = self.client()?;
        let req = self.build_request()?;

        debug!(expected_status = self.expected_status, "Sending request");
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Request cancelled");
                return Err(FetchError::cancelled(&self.location));
            }
            res = client.execute(req) => res.map_err(|e| FetchError::transport(&self.location, e))?,
        };

        let status = response.status().as_u16();
        if status != self.expected_status {
            let excerpt = drain_with_excerpt(response, cancel).await;
            debug!(status, excerpt_len = excerpt.len(), "Unexpected response status");
            return Err(FetchError::UnexpectedStatus {
                location: self.location.clone(),
                status,
                excerpt,
            });
        }

        debug!(status, content_length = ?response.content_length(), "Response body ready");
        Ok(ResponseBody::new(self.location.clone(), response, cancel.clone()))
    }

    /// [`Fetcher::open`] bounded by `timeout`.
    ///
    /// The deadline covers the request and, through the returned
    /// [`ResponseBody`], reads of the body. Nothing runs in the background:
    /// the deadline is checked only while this call or a body read is pending.
    pub async fn open_with_timeout(&self, timeout: Duration) -> Result<ResponseBody, FetchError> {
        let deadline = Instant::now() + timeout;
        match tokio::time::timeout_at(deadline, self.open(&CancellationToken::new())).await {
            Ok(result) => result.map(|body| body.with_deadline(deadline)),
            Err(_) => {
                debug!(?timeout, "Request deadline expired");
                Err(FetchError::cancelled(&self.location))
            }
        }
    }

    fn client(&self) -> Result<Arc<dyn HttpClient>, FetchError> {
        match &self.transport {
            Transport::Default => Ok(Arc::new(BasicClient::shared())),
            Transport::Override(client) => Ok(Arc::clone(client)),
            Transport::InvalidProxy { proxy, reason } => Err(FetchError::transport(
                &self.location,
                TransportFailure::Proxy {
                    proxy: proxy.clone(),
                    reason: reason.clone(),
                },
            )),
        }
    }

    fn build_request(&self) -> Result<Request, FetchError> {
        let mut req = Request::new(Method::GET, self.url.clone());

        for (name, value) in &self.headers {
            let invalid = || {
                FetchError::transport(&self.location, TransportFailure::InvalidHeader { name: name.clone() })
            };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            req.headers_mut().insert(header_name, header_value);
        }

        Ok(req)
    }
}

impl std::fmt::Debug for Fetcher {
    // Header values may hold credentials, so only names are shown.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let transport = match &self.transport {
            Transport::Default => "default",
            Transport::Override(_) => "override",
            Transport::InvalidProxy { .. } => "invalid proxy",
        };
        f.debug_struct("Fetcher")
            .field("location", &self.location)
            .field("expected_status", &self.expected_status)
            .field("headers", &self.headers.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("transport", &transport)
            .finish()
    }
}
