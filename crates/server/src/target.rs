//! Request target classification.
//!
//! Archive URLs are addressed as `/{http|https}://host/path`. Anything else is
//! a resource the browser resolved relative to an archived page, and is sent
//! back under that page's origin using the `Referer`.

use std::sync::LazyLock;

use axum::http::{HeaderMap, Uri, header};
use regex::Regex;

/// First `/http(s)://host` segment of an archive path.
static ARCHIVED_ORIGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/https?://.+?(?:/|$)").expect("archived origin pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Fetch this URL from the archive.
    Archive(String),
    /// Redirect this path (with query) under the referring page's origin.
    Referred(String),
}

/// Classify a request by its path and query.
pub fn classify(path_and_query: &str) -> Target {
    let Some(rest) = path_and_query.strip_prefix('/') else {
        return Target::Referred(path_and_query.to_string());
    };

    let Some(after_scheme) = strip_scheme(rest) else {
        return Target::Referred(path_and_query.to_string());
    };

    if after_scheme.is_empty() {
        return Target::Referred(path_and_query.to_string());
    }

    // `/https://images/a.gif`: the browser resolved a relative link against
    // an archive path, so the "host" is really a path segment.
    if let Some((host, _)) = after_scheme.split_once('/')
        && !host.contains('.')
    {
        return Target::Referred(format!("/{after_scheme}"));
    }

    Target::Archive(rest.to_string())
}

fn strip_scheme(s: &str) -> Option<&str> {
    s.strip_prefix("http://").or_else(|| s.strip_prefix("https://"))
}

/// `http://{Host}` of the gateway as the client addressed it.
pub fn gateway_origin(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .map(String::from)
        .or_else(|| uri.authority().map(|a| a.to_string()))?;

    Some(format!("http://{host}"))
}

/// Archived origin (`https://example.com`) of a referring gateway page.
///
/// `None` when the referer does not point into an archive path.
pub fn referer_origin(referer: &str) -> Option<&str> {
    let found = ARCHIVED_ORIGIN.find(referer)?;
    Some(found.as_str().trim_matches('/'))
}
