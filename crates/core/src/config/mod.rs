//! Gateway configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (WAYGATE_*)
//! 2. TOML or JSON config file (if WAYGATE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Toml},
};
use serde::{Deserialize, Serialize};

mod proxy;
mod validation;

pub use proxy::ProxyEndpoint;
pub use validation::ConfigError;

/// Gateway configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (WAYGATE_*, nested keys split on `__`)
/// 2. Config file from WAYGATE_CONFIG_FILE (if set)
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Port the gateway listens on.
    ///
    /// Set via WAYGATE_PORT environment variable.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address the gateway binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Log every archive request at info level instead of debug.
    #[serde(default, alias = "logNewRequests")]
    pub log_new_requests: bool,

    /// Cookie header sent with every upstream request, if non-empty.
    #[serde(default)]
    pub cookies: String,

    /// Outbound proxies as `host:port`, used for retries.
    #[serde(default)]
    pub proxies: Vec<String>,

    /// Minimum delay between two upstream fetches, in milliseconds.
    ///
    /// Set via WAYGATE_REQUEST_DELAY_MS environment variable.
    #[serde(default = "default_request_delay_ms", alias = "requestDelay")]
    pub request_delay_ms: u64,

    /// Snapshot cache settings.
    #[serde(default)]
    pub caching: CachingConfig,

    /// Per-client request limits.
    #[serde(default, alias = "rateLimit")]
    pub rate_limit: RateLimitConfig,

    /// Host serving archived snapshots.
    #[serde(default = "default_archive_host")]
    pub archive_host: String,

    /// Host answering availability queries.
    #[serde(default = "default_availability_host")]
    pub availability_host: String,

    /// User-Agent string for upstream requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for a single upstream attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Snapshot cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound on cached payload bytes.
    #[serde(default = "default_cache_max_size", alias = "maxSize")]
    pub max_size: u64,
}

impl Default for CachingConfig {
    fn default() -> Self {
        Self { enabled: true, max_size: default_cache_max_size() }
    }
}

/// Fixed-window request limits applied per client address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_window_ms", alias = "window")]
    pub window_ms: u64,

    #[serde(default = "default_rate_limit")]
    pub limit: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { window_ms: default_rate_limit_window_ms(), limit: default_rate_limit() }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

fn default_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "0.0.0.0".into()
}

fn default_request_delay_ms() -> u64 {
    250
}

fn default_cache_max_size() -> u64 {
    256 * 1024 * 1024 // 256 MiB
}

fn default_rate_limit_window_ms() -> u64 {
    60_000
}

fn default_rate_limit() -> u32 {
    50
}

fn default_archive_host() -> String {
    "https://web.archive.org".into()
}

fn default_availability_host() -> String {
    "https://archive.org".into()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36"
        .into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            log_new_requests: false,
            cookies: String::new(),
            proxies: Vec::new(),
            request_delay_ms: default_request_delay_ms(),
            caching: CachingConfig::default(),
            rate_limit: RateLimitConfig::default(),
            archive_host: default_archive_host(),
            availability_host: default_availability_host(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl GatewayConfig {
    /// Per-attempt timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Pacing delay between upstream fetches.
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when `bind_address` is not an IP address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|e| ConfigError::Invalid { field: "bind_address".into(), reason: format!("{e}") })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Parsed proxy pool, in configuration order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for the first entry that is not `host:port`.
    pub fn proxy_endpoints(&self) -> Result<Vec<ProxyEndpoint>, ConfigError> {
        self.proxies
            .iter()
            .map(|raw| {
                raw.parse::<ProxyEndpoint>()
                    .map_err(|e| ConfigError::Invalid { field: "proxies".into(), reason: e.to_string() })
            })
            .collect()
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `WAYGATE_`
    /// 2. File from `WAYGATE_CONFIG_FILE` (if set); `.json` is read as JSON, anything else as TOML
    /// 3. Built-in defaults via the serde field defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        // Defaults come from the serde field defaults. Seeding them as a layer
        // would collide with the camelCase aliases accepted from files.
        let mut figment = Figment::new();

        if let Ok(config_path) = std::env::var("WAYGATE_CONFIG_FILE") {
            figment = if is_json(&config_path) {
                figment.merge(Json::file(&config_path))
            } else {
                figment.merge(Toml::file(&config_path))
            };
        }

        figment = figment.merge(
            Env::prefixed("WAYGATE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

fn is_json(path: &str) -> bool {
    Path::new(path).extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
