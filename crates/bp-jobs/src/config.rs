//! Job lifecycle configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default delay after a "not found yet" or transient status error.
pub const DEFAULT_NOT_FOUND_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Default caller timeout for a whole job.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Hard ceiling no caller timeout can exceed.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Configuration for submitting, polling and staging jobs.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub poll_interval: Duration,
    pub not_found_retry_delay: Duration,
    pub timeout: Duration,
    pub max_timeout: Duration,
    /// Directory staged wire files are written to.
    pub staging_dir: PathBuf,
    /// Keep staged files after a successful run.
    pub verbose: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            not_found_retry_delay: DEFAULT_NOT_FOUND_RETRY_DELAY,
            timeout: DEFAULT_TIMEOUT,
            max_timeout: MAX_TIMEOUT,
            staging_dir: std::env::temp_dir().join("bulkport"),
            verbose: false,
        }
    }
}

impl JobConfig {
    /// Create a new config builder.
    pub fn builder() -> JobConfigBuilder {
        JobConfigBuilder::default()
    }

    /// Effective polling ceiling: the caller timeout capped by the hard maximum.
    pub fn ceiling(&self) -> Duration {
        self.timeout.min(self.max_timeout)
    }
}

/// Builder for JobConfig.
#[derive(Debug, Default)]
pub struct JobConfigBuilder {
    config: JobConfig,
}

impl JobConfigBuilder {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn with_not_found_retry_delay(mut self, delay: Duration) -> Self {
        self.config.not_found_retry_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.config.max_timeout = max_timeout;
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.staging_dir = dir.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> JobConfig {
        self.config
    }
}
