// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Which store implementations the service runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// DynamoDB for the catalog, S3 for media
    #[default]
    Aws,
    /// Process-local stores, for development runs
    Memory,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws" => Ok(Backend::Aws),
            "memory" => Ok(Backend::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Top-level service configuration, validated once at startup
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: Backend,
    /// AWS region; falls back to the SDK's default provider chain when unset
    pub region: Option<String>,
    pub catalog: CatalogConfig,
    pub media: MediaConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub table_name: String,
    /// Override for DynamoDB-compatible local endpoints
    pub endpoint_url: Option<String>,
    /// Attempts per catalog request, including the first
    pub max_attempts: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            table_name: String::new(),
            endpoint_url: None,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MediaConfig {
    pub bucket: String,
    /// Prepended to every storage key
    pub key_prefix: String,
    /// Override for S3-compatible endpoints; enables path-style addressing
    pub endpoint_url: Option<String>,
    pub wait: WaitPolicy,
}

/// How long and how often to poll for a media object before giving up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Consecutive failed existence checks tolerated before the error is surfaced
    pub max_failures: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            max_failures: 3,
        }
    }
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retrying after `attempt` failed attempts (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Largest media download accepted, in bytes
    pub max_media_bytes: u64,
    pub download_timeout: Duration,
    pub upload_retry: RetryPolicy,
    /// Cap on episodes taken from one RSS feed import; 0 means no cap
    pub max_feed_episodes: usize,
    /// Log ingestion stage events; off drops them
    pub report_events: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_media_bytes: 512 * 1024 * 1024,
            download_timeout: Duration::from_secs(300),
            upload_retry: RetryPolicy::default(),
            max_feed_episodes: 0,
            report_events: true,
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

impl Config {
    /// Check the configuration for values the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == Backend::Aws {
            if self.catalog.table_name.trim().is_empty() {
                return Err(invalid("table_name", "must not be empty"));
            }
            if self.media.bucket.trim().is_empty() {
                return Err(invalid("bucket", "must not be empty"));
            }
        }

        if self.catalog.max_attempts == 0 {
            return Err(invalid("catalog.max_attempts", "must be at least 1"));
        }

        let wait = &self.media.wait;
        if wait.poll_interval.is_zero() {
            return Err(invalid("media.wait.poll_interval", "must be greater than zero"));
        }
        if wait.timeout < wait.poll_interval {
            return Err(invalid(
                "media.wait.timeout",
                "must be at least the poll interval",
            ));
        }
        if wait.max_failures == 0 {
            return Err(invalid("media.wait.max_failures", "must be at least 1"));
        }

        if self.ingest.max_media_bytes == 0 {
            return Err(invalid("ingest.max_media_bytes", "must be greater than zero"));
        }
        if self.ingest.upload_retry.max_attempts == 0 {
            return Err(invalid("ingest.upload_retry.max_attempts", "must be at least 1"));
        }

        Ok(())
    }
}
