//! HTTP routes of the gateway.
//!
//! `/` and `/configure` manage the client's preferences. Every other GET is
//! either an archive URL, fetched in a background task bound to the client
//! connection, or a relative resource redirected under its referring page.

use std::collections::HashMap;

use axum::extract::{Form, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Router, middleware};
use axum_extra::extract::cookie::CookieJar;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use waygate_client::dispatch::RequestContext;
use waygate_core::ClientPreferences;

use crate::error::WebError;
use crate::outcome;
use crate::page;
use crate::preferences;
use crate::rate_limit;
use crate::responder::{Delivery, GatedResponder};
use crate::state::AppState;
use crate::target::{self, Target};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/configure", post(configure))
        .fallback(gateway)
        .layer(middleware::from_fn_with_state(state.limiter.clone(), rate_limit::enforce))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(headers: HeaderMap, uri: Uri, jar: CookieJar) -> Result<Html<String>, WebError> {
    let origin = target::gateway_origin(&headers, &uri).ok_or(WebError::MissingHost)?;
    Ok(Html(page::index(&origin, &preferences::from_cookies(&jar))))
}

async fn configure(headers: HeaderMap, jar: CookieJar, Form(form): Form<HashMap<String, String>>) -> Response {
    let jar = preferences::apply_form(jar, &form);
    let back = headers.get(header::REFERER).and_then(|v| v.to_str().ok()).unwrap_or("/");
    (jar, outcome::found(back)).into_response()
}

async fn gateway(
    State(state): State<AppState>, method: Method, headers: HeaderMap, uri: Uri, jar: CookieJar,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = uri.path_and_query().map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());
    let Some(origin) = target::gateway_origin(&headers, &uri) else {
        return WebError::MissingHost.into_response();
    };

    match target::classify(&path) {
        Target::Archive(url) => archive(state, url, preferences::from_cookies(&jar), origin).await,
        Target::Referred(path) => referred(&headers, &origin, &path),
    }
}

/// Fetch `url` in a task cancelled when this handler is dropped.
async fn archive(state: AppState, url: String, prefs: ClientPreferences, origin: String) -> Response {
    let cancel = CancellationToken::new();
    // dropped with this future when the client disconnects
    let guard = cancel.clone().drop_guard();
    let (responder, receiver) = GatedResponder::channel(cancel.clone());

    tokio::spawn(async move {
        let ctx = RequestContext::new(origin);
        let response = match state.fetcher.fetch_archive(prefs.target_date, &url, &cancel, &prefs).await {
            Ok(outcome) => match outcome::render(outcome, &state.dispatcher, &prefs, &ctx) {
                Some(response) => response,
                None => {
                    tracing::debug!(url, "client disconnected, fetch aborted");
                    return;
                }
            },
            Err(e) => WebError::from(e).into_response(),
        };

        if responder.deliver(response) == Delivery::Suppressed {
            tracing::debug!(url, "client disconnected, response dropped");
        }
    });

    let response = receiver.await;
    guard.disarm();

    match response {
        Ok(response) => response,
        Err(_) => WebError::Internal("fetch task ended without a response".into()).into_response(),
    }
}

/// Redirect a relative resource under the archived origin of its referring page.
fn referred(headers: &HeaderMap, origin: &str, path: &str) -> Response {
    let referer = headers.get(header::REFERER).and_then(|v| v.to_str().ok());

    match referer {
        Some(referer) if referer.starts_with(origin) => match target::referer_origin(referer) {
            Some(archived) => outcome::found(&format!("{origin}/{archived}{path}")),
            None => WebError::UnresolvedReferer.into_response(),
        },
        _ => (StatusCode::BAD_REQUEST, Html(page::not_an_archive_url(origin))).into_response(),
    }
}
