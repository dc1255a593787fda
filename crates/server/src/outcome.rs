//! Mapping of fetch outcomes onto HTTP responses.

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use waygate_client::dispatch::RequestContext;
use waygate_client::{FetchOutcome, ResponseDispatcher};
use waygate_core::ClientPreferences;

pub const NOT_ARCHIVED: &str = "This resource hasn't been archived.";
pub const UNREACHABLE: &str = "Couldn't contact the Wayback Machine. You may be rate-limited.";
pub const MISSING_CONTENT_TYPE: &str = "HTTP error 500. Reason: couldn't determine the content type.";

/// Response for a terminal outcome. `None` for [`FetchOutcome::Aborted`],
/// which must not be answered.
pub fn render(
    outcome: FetchOutcome, dispatcher: &ResponseDispatcher, prefs: &ClientPreferences, ctx: &RequestContext,
) -> Option<Response> {
    let response = match outcome {
        FetchOutcome::Success(archived) => {
            let body = dispatcher.dispatch(&archived, prefs, ctx);
            let content_type = HeaderValue::from_str(&archived.content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
            ([(header::CONTENT_TYPE, content_type)], Body::from(body)).into_response()
        }
        FetchOutcome::NotArchived => (StatusCode::NOT_FOUND, NOT_ARCHIVED).into_response(),
        FetchOutcome::Unreachable => (StatusCode::BAD_GATEWAY, UNREACHABLE).into_response(),
        FetchOutcome::UpstreamStatus(code) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, status.canonical_reason().unwrap_or_default()).into_response()
        }
        FetchOutcome::Redirect(location) => found(&location),
        FetchOutcome::MissingContentType => (StatusCode::INTERNAL_SERVER_ERROR, MISSING_CONTENT_TYPE).into_response(),
        FetchOutcome::Aborted => return None,
    };
    Some(response)
}

/// 302 to `location`.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => {
            tracing::warn!(location, "redirect target is not a valid header value");
            (StatusCode::BAD_REQUEST, "HTTP error 400. Reason: invalid redirect target.").into_response()
        }
    }
}
