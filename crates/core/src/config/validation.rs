//! Configuration validation rules.
//!
//! This module provides validation logic for `GatewayConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::GatewayConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

const MAX_REQUEST_DELAY_MS: u64 = 60_000;

impl GatewayConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `port` is 0
    /// - `bind_address` is not an IP address
    /// - `request_delay_ms` exceeds one minute
    /// - caching is enabled with a `max_size` of 0
    /// - a proxy is not `host:port`
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - an upstream host is not an http(s) URL
    /// - the rate limit window or limit is 0
    ///
    /// Returns `ConfigError::Missing` if an upstream host is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid { field: "port".into(), reason: "must be greater than 0".into() });
        }

        if self.request_delay_ms > MAX_REQUEST_DELAY_MS {
            return Err(ConfigError::Invalid {
                field: "request_delay_ms".into(),
                reason: "must not exceed 1 minute (60000ms)".into(),
            });
        }

        if self.caching.enabled && self.caching.max_size == 0 {
            return Err(ConfigError::Invalid {
                field: "caching.max_size".into(),
                reason: "must be greater than 0 when caching is enabled".into(),
            });
        }

        self.listen_addr()?;

        self.proxy_endpoints()?;

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        validate_host("archive_host", &self.archive_host)?;
        validate_host("availability_host", &self.availability_host)?;

        if self.rate_limit.window_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "rate_limit.window_ms".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.rate_limit.limit == 0 {
            return Err(ConfigError::Invalid {
                field: "rate_limit.limit".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if !self.caching.enabled {
            tracing::warn!("snapshot caching is disabled; every request will reach the archive");
        }

        Ok(())
    }
}

fn validate_host(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Missing { field: field.into(), hint: format!("set WAYGATE_{}", field.to_uppercase()) });
    }

    let parsed = url::Url::parse(value)
        .map_err(|e| ConfigError::Invalid { field: field.into(), reason: e.to_string() })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::Invalid { field: field.into(), reason: format!("unsupported scheme: {scheme}") }),
    }
}
