//! Authenticated client for the bulk exchange platform.
//!
//! This module provides `PlatformClient`, which combines a bearer token with
//! an HTTP client and provides typed JSON methods for API interactions.
//!
//! ## Security
//!
//! - Access tokens are redacted in Debug output
//! - Result file downloads never carry the bearer token; those URLs are
//!   pre-authenticated and often point at third-party storage

use serde::{de::DeserializeOwned, Serialize};
use tracing::instrument;

use crate::client::HttpClient;
use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{MultipartField, RequestBuilder};
use crate::DEFAULT_API_VERSION;

/// High-level platform API client.
///
/// # Example
///
/// ```rust,ignore
/// use bulkport_client::PlatformClient;
///
/// let client = PlatformClient::new("https://shop.example.com", "token")?;
/// let created: serde_json::Value = client
///     .post_json(&client.bulk_url("export"), &serde_json::json!({"query": "{ products { id } }"}))
///     .await?;
/// ```
#[derive(Clone)]
pub struct PlatformClient {
    http: HttpClient,
    base_url: String,
    access_token: String,
    api_version: String,
}

impl std::fmt::Debug for PlatformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformClient")
            .field("base_url", &self.base_url)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl PlatformClient {
    /// Create a new client with the given base URL and access token.
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        Self::with_config(base_url, access_token, ClientConfig::default())
    }

    /// Create a new client with custom configuration.
    pub fn with_config(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let parsed = url::Url::parse(&base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::new(ErrorKind::InvalidUrl(format!(
                "unsupported scheme '{}' in base URL",
                parsed.scheme()
            ))));
        }

        let http = HttpClient::new(config)?;
        Ok(Self {
            http,
            base_url,
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    /// Set the API version segment (e.g., "v2").
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the API version.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Get the underlying HTTP client.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Build the full URL for a path.
    ///
    /// Absolute URLs are returned unchanged; paths are joined to the base URL.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Build the bulk API URL for a path.
    ///
    /// Example: `bulk_url("jobs/abc")` -> `{base}/api/v1/bulk/jobs/abc`
    pub fn bulk_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/api/{}/bulk/{}", self.base_url, self.api_version, path)
    }

    /// Create a GET request builder with authentication.
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.http.get(url).bearer_auth(&self.access_token)
    }

    /// Create a POST request builder with authentication.
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.http.post(url).bearer_auth(&self.access_token)
    }

    /// Execute a request and return the raw response.
    pub async fn execute(&self, request: RequestBuilder) -> Result<crate::Response> {
        self.http.execute(request).await
    }

    /// GET request with JSON response deserialization.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let request = self.get(&self.url(url));
        self.http.send_json(request).await
    }

    /// POST request with JSON body and response.
    #[instrument(skip(self, body), fields(url = %url))]
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.post(&self.url(url)).json(body)?;
        self.http.send_json(request).await
    }

    /// POST a multipart upload with JSON response.
    #[instrument(skip(self, fields), fields(url = %url, parts = fields.len()))]
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        url: &str,
        fields: Vec<MultipartField>,
    ) -> Result<T> {
        let request = self
            .post(&self.url(url))
            .multipart(fields)
            .timeout(self.http.config().transfer_timeout);
        self.http.send_json(request).await
    }

    /// Fetch a pre-authenticated file URL as text.
    ///
    /// The bearer token is deliberately not attached.
    #[instrument(skip(self, url))]
    pub async fn download_text(&self, url: &str) -> Result<String> {
        let request = self
            .http
            .get(self.url(url))
            .timeout(self.http.config().transfer_timeout);
        self.http.execute(request).await?.text().await
    }
}
