mod auth;
mod basic;
mod body;
mod client;
mod fetcher;

pub use auth::Credentials;
pub use basic::BasicClient;
pub use body::{MAX_EXCERPT, ResponseBody};
pub use client::HttpClient;
pub use fetcher::{DEFAULT_EXPECTED_STATUS, Fetcher};
