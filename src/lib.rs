//! Opens a URL and hands back its body as a stream, or a typed error when the
//! resource could not be retrieved with the expected status.

pub mod config;
pub mod error;
pub mod fetch;

pub use config::FetcherConfig;
pub use error::{FetchError, TransportFailure};
pub use fetch::{BasicClient, Credentials, Fetcher, HttpClient, MAX_EXCERPT, ResponseBody};
