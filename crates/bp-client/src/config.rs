//! Client configuration.

use crate::retry::RetryConfig;
use std::time::Duration;

/// HTTP settings for talking to the bulk exchange API.
///
/// Job creation and status calls are small and use `timeout`; multipart
/// uploads and result downloads can be large and use `transfer_timeout`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `None` sends every request exactly once.
    pub retry: Option<RetryConfig>,
    pub timeout: Duration,
    pub transfer_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: Some(RetryConfig::default()),
            timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(300),
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = Some(retry);
        self
    }

    pub fn without_retry(mut self) -> Self {
        self.config.retry = None;
        self
    }

    /// Timeout for job creation and status calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Timeout for uploads and result downloads.
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.config.transfer_timeout = timeout;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
