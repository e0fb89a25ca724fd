use async_trait::async_trait;
use reqwest::{Request, Response};

/// The transport a [`Fetcher`](super::Fetcher) sends its request through.
///
/// Implementations own connection management, TLS and DNS. They must not
/// leave a connection open when `execute` returns an error.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
