//! Error types returned by [`Fetcher`](crate::fetch::Fetcher).
//!
//! Callers match on [`FetchError`] to decide what to do next:
//! - [`FetchError::InvalidRequest`] is permanent, the location must be fixed.
//! - [`FetchError::Transport`] is a network-level failure and may be retried.
//! - [`FetchError::UnexpectedStatus`] carries the server's diagnostic text.

use bytes::Bytes;

/// Failure of a fetch, either at construction or while opening the body.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid request for {location}: {reason}")]
    InvalidRequest { location: String, reason: String },

    #[error("request to {location} failed: {source}")]
    Transport {
        location: String,
        #[source]
        source: TransportFailure,
    },

    #[error("{location} returned status {status}; error = {}", String::from_utf8_lossy(.excerpt))]
    UnexpectedStatus {
        location: String,
        status: u16,
        /// At most [`MAX_EXCERPT`](crate::fetch::MAX_EXCERPT) bytes of the response body.
        excerpt: Bytes,
    },
}

/// Underlying cause of a [`FetchError::Transport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportFailure {
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid header {name:?}")]
    InvalidHeader { name: String },

    #[error("unusable proxy {proxy}: {reason}")]
    Proxy { proxy: String, reason: String },
}

impl FetchError {
    pub(crate) fn transport(location: &str, source: impl Into<TransportFailure>) -> Self {
        FetchError::Transport {
            location: location.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn cancelled(location: &str) -> Self {
        Self::transport(location, TransportFailure::Cancelled)
    }

    /// The location the failed request was aimed at.
    pub fn location(&self) -> &str {
        match self {
            FetchError::InvalidRequest { location, .. }
            | FetchError::Transport { location, .. }
            | FetchError::UnexpectedStatus { location, .. } => location,
        }
    }

    /// The status the server answered with, for [`FetchError::UnexpectedStatus`].
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The body excerpt, for [`FetchError::UnexpectedStatus`].
    pub fn excerpt(&self) -> Option<&[u8]> {
        match self {
            FetchError::UnexpectedStatus { excerpt, .. } => Some(&excerpt[..]),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport { .. })
    }

    /// Returns `true` if the cancellation token fired before the operation finished.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            FetchError::Transport {
                source: TransportFailure::Cancelled,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_status_display() {
        let err = FetchError::UnexpectedStatus {
            location: "http://example.test/data".to_string(),
            status: 404,
            excerpt: Bytes::from_static(b"not found"),
        };
        assert_eq!(
            err.to_string(),
            "http://example.test/data returned status 404; error = not found"
        );
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.excerpt(), Some(&b"not found"[..]));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_cancelled_is_transport() {
        let err = FetchError::cancelled("http://example.test/");
        assert!(err.is_transport());
        assert!(err.is_cancelled());
        assert_eq!(err.location(), "http://example.test/");
        assert_eq!(err.status(), None);
        assert!(err.excerpt().is_none());
    }

    #[test]
    fn test_invalid_header_is_not_cancelled() {
        let err = FetchError::transport(
            "http://example.test/",
            TransportFailure::InvalidHeader {
                name: "bad name".to_string(),
            },
        );
        assert!(err.is_transport());
        assert!(!err.is_cancelled());
        assert!(err.to_string().contains("bad name"));
    }
}
