//! Unified error types for the wayback gateway.
//!
//! Only conditions that escape the retrieval pipeline live here. Transport
//! failures the fetcher can classify are resolved into outcomes instead.

/// Unified error types for the gateway.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty target URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A configured proxy could not be turned into a usable endpoint.
    #[error("INVALID_PROXY: {0}")]
    InvalidProxy(String),

    /// The HTTP client could not be constructed.
    #[error("CLIENT_BUILD: {0}")]
    ClientBuild(String),

    /// Upstream failure that is not a transport error, e.g. a malformed request.
    #[error("UPSTREAM_FATAL: {0}")]
    Upstream(String),
}

impl Error {
    /// Short machine-readable code, the prefix of the display string.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::InvalidProxy(_) => "INVALID_PROXY",
            Error::ClientBuild(_) => "CLIENT_BUILD",
            Error::Upstream(_) => "UPSTREAM_FATAL",
        }
    }
}
