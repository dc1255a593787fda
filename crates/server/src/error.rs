//! Structured errors for the gateway's HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Structured errors for the gateway's HTTP surface.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// The request carries no `Host` header, so the gateway origin is unknown.
    #[error("MISSING_HOST: request has no Host header")]
    MissingHost,

    /// The referer points at the gateway but not into an archived page.
    #[error("BAD_REFERER: couldn't determine origin from the Referer header")]
    UnresolvedReferer,

    /// Failure escaping the retrieval pipeline.
    #[error(transparent)]
    Core(#[from] waygate_core::Error),

    /// The background fetch ended without answering.
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::MissingHost | WebError::UnresolvedReferer => StatusCode::BAD_REQUEST,
            WebError::Core(waygate_core::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            WebError::Core(_) | WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            WebError::MissingHost => "your browser isn't sending the Host header.",
            WebError::UnresolvedReferer => "couldn't determine origin from the Referer header",
            WebError::Core(waygate_core::Error::InvalidInput(_)) => "the requested URL is not valid.",
            WebError::Core(_) | WebError::Internal(_) => "internal error.",
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, format!("HTTP error {}. Reason: {}", status.as_u16(), self.reason())).into_response()
    }
}
