//! # bulkport-client
//!
//! Core HTTP client infrastructure for the bulk exchange API.
//!
//! This crate provides the foundational HTTP client with:
//! - Automatic retry with exponential backoff and jitter
//! - Compression support (gzip, deflate)
//! - Rate limit detection and handling
//! - Multipart uploads that survive retries
//! - Platform error parsing with message sanitizing
//! - Request/response tracing
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! │  (bulkport-jobs: submit, poll, classify, download)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PlatformClient                           │
//! │  - Holds base URL + bearer token + HTTP client              │
//! │  - Provides typed JSON methods (get_json, post_json, etc.)  │
//! │  - Fetches pre-authenticated result URLs without the token  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HttpClient                               │
//! │  - Raw HTTP with retry, compression, rate limiting          │
//! │  - Response handling                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use bulkport_client::PlatformClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bulkport_client::Error> {
//!     let client = PlatformClient::new("https://shop.example.com", "access_token")?;
//!
//!     let job: serde_json::Value = client
//!         .get_json(&client.bulk_url("jobs/job-123"))
//!         .await?;
//!
//!     println!("{}", job["status"]);
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod platform_client;
mod request;
mod response;
mod retry;

pub use client::HttpClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use platform_client::PlatformClient;
pub use request::{MultipartField, RequestBuilder, RequestMethod};
pub use response::{Response, ResponseExt};
pub use retry::{BackoffStrategy, RetryConfig, RetryPolicy};

/// Default bulk API version segment.
pub const DEFAULT_API_VERSION: &str = "v1";

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("bulkport/", env!("CARGO_PKG_VERSION"));
