//! Outbound proxy endpoints.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A `host:port` proxy taken from the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyEndpoint {
    host: String,
    port: u16,
}

impl ProxyEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Proxy URL understood by HTTP clients (`http://host:port`).
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl FromStr for ProxyEndpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (host, port) = trimmed
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidProxy(format!("expected host:port, got '{trimmed}'")))?;

        if host.is_empty() {
            return Err(Error::InvalidProxy(format!("missing host in '{trimmed}'")));
        }

        let port: u16 = port.parse().map_err(|_| Error::InvalidProxy(format!("invalid port in '{trimmed}'")))?;
        if port == 0 {
            return Err(Error::InvalidProxy(format!("port must be non-zero in '{trimmed}'")));
        }

        Ok(Self { host: host.to_string(), port })
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
