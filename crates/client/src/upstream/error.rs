//! Classification of upstream transport failures.

/// How an upstream request failed.
///
/// The split decides what the fetcher does next: `Unreachable` is retried,
/// `Status` is terminal, `Fatal` escapes the pipeline as an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No HTTP response arrived (DNS, connect, reset, proxy failure, timeout).
    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    /// The upstream answered with a non-success status.
    #[error("HTTP error: {status}")]
    Status { status: u16 },

    /// Not a transport condition, e.g. a request that could not be built.
    #[error("fatal upstream error: {0}")]
    Fatal(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            TransportError::Fatal(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status { status: status.as_u16() }
        } else if err.is_timeout() {
            TransportError::Unreachable(format!("timed out: {err}"))
        } else {
            TransportError::Unreachable(err.to_string())
        }
    }
}
