//! Download configuration.

use std::time::Duration;

use crate::coord::Projection;
use crate::fetch::{classify_by_status, RetryPolicy, RetryStrategy};
use crate::provider::{UrlTemplate, DEFAULT_TIMEOUT_SECS, DEFAULT_ZOOM_OFFSET};

/// Commit the store after this many visited tiles.
pub const DEFAULT_FLUSH_INTERVAL: u64 = 100;

/// Configuration for a tile download run.
///
/// Groups the tile server, projection and retry settings. Values are
/// immutable once built and passed to the components that need them.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use getmaps::config::DownloadConfig;
/// use getmaps::fetch::RetryPolicy;
///
/// // Using defaults
/// let config = DownloadConfig::default();
/// assert_eq!(config.flush_interval(), 100);
/// assert_eq!(config.zoom_offset(), 4);
///
/// // Custom configuration
/// let config = DownloadConfig::new()
///     .with_timeout_secs(60)
///     .with_flush_interval(500)
///     .with_retry(RetryPolicy::fixed(5, Duration::from_secs(1)));
/// assert_eq!(config.timeout_secs(), 60);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadConfig {
    url_template: UrlTemplate,
    zoom_offset: i32,
    timeout_secs: u64,
    flush_interval: u64,
    retry: RetryPolicy,
    permanent_client_errors: bool,
    projection: Projection,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            url_template: UrlTemplate::default(),
            zoom_offset: DEFAULT_ZOOM_OFFSET,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            retry: RetryPolicy::default(),
            permanent_client_errors: false,
            projection: Projection::default(),
        }
    }
}

impl DownloadConfig {
    /// Create a new download configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tile server URL template.
    pub fn with_url_template(mut self, template: UrlTemplate) -> Self {
        self.url_template = template;
        self
    }

    /// Set the offset between internal and server zoom levels.
    ///
    /// The server receives `zoom - offset`. Default: 4.
    pub fn with_zoom_offset(mut self, offset: i32) -> Self {
        self.zoom_offset = offset;
        self
    }

    /// Set the per-request timeout in seconds. Default: 30 seconds.
    ///
    /// Callers reject 0, which would fail every request at once.
    pub fn with_timeout_secs(mut self, timeout: u64) -> Self {
        self.timeout_secs = timeout;
        self
    }

    /// Set how many visited tiles go into one store commit.
    ///
    /// Values below 1 are raised to 1. Default: 100.
    pub fn with_flush_interval(mut self, interval: u64) -> Self {
        self.flush_interval = interval.max(1);
        self
    }

    /// Set the retry policy. Default: retry forever without delay.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Treat 4xx responses (except 408/429) as permanent failures.
    pub fn with_permanent_client_errors(mut self, enabled: bool) -> Self {
        self.permanent_client_errors = enabled;
        self
    }

    /// Set the projection used to plan tile ranges.
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn url_template(&self) -> &UrlTemplate {
        &self.url_template
    }

    pub fn zoom_offset(&self) -> i32 {
        self.zoom_offset
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn flush_interval(&self) -> u64 {
        self.flush_interval
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn permanent_client_errors(&self) -> bool {
        self.permanent_client_errors
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Builds the retry strategy for the fetch loop.
    pub fn retry_strategy(&self) -> RetryStrategy {
        let strategy = RetryStrategy::new(self.retry.clone());
        if self.permanent_client_errors {
            strategy.with_classifier(classify_by_status)
        } else {
            strategy
        }
    }
}
