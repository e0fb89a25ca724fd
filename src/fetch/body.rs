use std::io;

use bytes::{Bytes, BytesMut};
use futures::Stream;
use reqwest::header::HeaderMap;
use tokio::io::AsyncRead;
use tokio::time::Instant;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

/// Upper bound on the body excerpt kept for an unexpected status.
pub const MAX_EXCERPT: usize = 8192;

/// The open body of a successful response.
///
/// The underlying connection stays checked out until this value is closed or
/// dropped. Reading the body to the end lets the transport reuse the
/// connection; dropping it early closes the connection instead.
///
/// Reads observe the cancellation token passed to
/// [`Fetcher::open`](super::Fetcher::open): once it fires, every further read
/// fails with a cancelled [`FetchError::Transport`]. A body returned by
/// [`Fetcher::open_with_timeout`](super::Fetcher::open_with_timeout) fails the
/// same way once its deadline has passed.
pub struct ResponseBody {
    location: String,
    response: reqwest::Response,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ResponseBody {
    pub(crate) fn new(location: String, response: reqwest::Response, cancel: CancellationToken) -> Self {
        Self {
            location,
            response,
            cancel,
            deadline: None,
        }
    }

    pub(crate) fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn status(&self) -> u16 {
        self.response.status().as_u16()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    /// Body length announced by the server, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Returns the next chunk of the body, or `None` once it is exhausted.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, FetchError> {
        let location = self.location.as_str();
        let cancel = &self.cancel;
        let response = &mut self.response;
        let deadline = self.deadline;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::cancelled(location)),
            _ = sleep_until_deadline(deadline) => Err(FetchError::cancelled(location)),
            chunk = response.chunk() => chunk.map_err(|e| FetchError::transport(location, e)),
        }
    }

    /// Reads the remainder of the body into memory.
    pub async fn bytes(mut self) -> Result<Bytes, FetchError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }

    /// Converts the body into a stream of chunks.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        futures::stream::try_unfold(self, |mut body| async move {
            match body.chunk().await {
                Ok(Some(chunk)) => Ok(Some((chunk, body))),
                Ok(None) => Ok(None),
                Err(e) => Err(io::Error::other(e)),
            }
        })
    }

    /// Converts the body into an [`AsyncRead`].
    pub fn into_reader(self) -> impl AsyncRead + Send + Unpin + 'static {
        StreamReader::new(Box::pin(self.into_stream()))
    }

    /// Releases the connection. Dropping the body has the same effect.
    pub fn close(self) {}
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBody")
            .field("location", &self.location)
            .field("status", &self.status())
            .field("content_length", &self.content_length())
            .finish()
    }
}

/// Collects up to [`MAX_EXCERPT`] bytes of `response`, reads and discards the
/// rest, then drops it so the connection goes back to the pool.
///
/// Read errors end the drain early and are not reported; the caller is already
/// failing with the status. Cancellation also ends it, closing the connection.
pub(crate) async fn drain_with_excerpt(mut response: reqwest::Response, cancel: &CancellationToken) -> Bytes {
    let mut excerpt = BytesMut::new();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            chunk = response.chunk() => chunk,
        };

        match chunk {
            Ok(Some(chunk)) => {
                let room = MAX_EXCERPT - excerpt.len();
                excerpt.extend_from_slice(&chunk[..chunk.len().min(room)]);
            }
            Ok(None) | Err(_) => break,
        }
    }

    drop(response);
    excerpt.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::io::AsyncReadExt;

    fn response(status: u16, body: impl Into<reqwest::Body>) -> reqwest::Response {
        http::Response::builder()
            .status(status)
            .body(body.into())
            .unwrap()
            .into()
    }

    fn body(content: &'static [u8]) -> ResponseBody {
        ResponseBody::new(
            "http://example.test/data".to_string(),
            response(200, content),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_drain_caps_excerpt() {
        let big = vec![b'x'; 3 * MAX_EXCERPT + 17];
        let excerpt = drain_with_excerpt(response(500, big), &CancellationToken::new()).await;
        assert_eq!(excerpt.len(), MAX_EXCERPT);
    }

    #[tokio::test]
    async fn test_drain_keeps_short_body() {
        let excerpt = drain_with_excerpt(response(404, "not found"), &CancellationToken::new()).await;
        assert_eq!(&excerpt[..], b"not found");
    }

    #[tokio::test]
    async fn test_drain_stops_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let excerpt = drain_with_excerpt(response(500, "ignored"), &cancel).await;
        assert!(excerpt.is_empty());
    }

    #[tokio::test]
    async fn test_bytes_reads_whole_body() {
        let body = body(b"hello");
        assert_eq!(body.status(), 200);
        assert_eq!(&body.bytes().await.unwrap()[..], b"hello");
    }

    #[tokio::test]
    async fn test_chunk_after_cancel_fails() {
        let cancel = CancellationToken::new();
        let mut body = ResponseBody::new(
            "http://example.test/data".to_string(),
            response(200, "hello"),
            cancel.clone(),
        );
        cancel.cancel();
        let err = body.chunk().await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_chunk_after_deadline_fails() {
        let mut body = body(b"hello").with_deadline(Instant::now());
        let err = body.chunk().await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_future_deadline_allows_reads() {
        let body = body(b"hello").with_deadline(Instant::now() + std::time::Duration::from_secs(60));
        assert_eq!(&body.bytes().await.unwrap()[..], b"hello");
    }

    #[tokio::test]
    async fn test_into_stream_yields_body() {
        let chunks: Vec<_> = body(b"stream me").into_stream().collect().await;
        let joined: Vec<u8> = chunks
            .into_iter()
            .flat_map(|c| c.unwrap().to_vec())
            .collect();
        assert_eq!(joined, b"stream me");
    }

    #[tokio::test]
    async fn test_into_reader_reads_to_end() {
        let mut reader = body(b"read me").into_reader();
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "read me");
    }
}
