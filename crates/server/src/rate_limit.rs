//! Fixed-window rate limiting per client IP.
//!
//! Every response carries `RateLimit-Policy` and `RateLimit` headers; a client
//! over its limit gets 429 with `Retry-After` until its window resets.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use tokio::time::Instant;

use waygate_core::config::RateLimitConfig;

/// Client table size past which expired windows are swept.
const SWEEP_THRESHOLD: usize = 10_000;

static RATELIMIT: HeaderName = HeaderName::from_static("ratelimit");
static RATELIMIT_POLICY: HeaderName = HeaderName::from_static("ratelimit-policy");

#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    started: Instant,
    hits: u32,
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the client's window resets.
    pub reset: Duration,
    pub window: Duration,
}

impl RateDecision {
    fn apply_headers(&self, headers: &mut HeaderMap) {
        let policy = format!("{};w={}", self.limit, ceil_secs(self.window));
        let state = format!("limit={}, remaining={}, reset={}", self.limit, self.remaining, ceil_secs(self.reset));

        if let Ok(value) = HeaderValue::from_str(&policy) {
            headers.insert(RATELIMIT_POLICY.clone(), value);
        }
        if let Ok(value) = HeaderValue::from_str(&state) {
            headers.insert(RATELIMIT.clone(), value);
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    limit: u32,
    clients: Mutex<HashMap<IpAddr, ClientWindow>>,
}

impl RateLimiter {
    pub fn new(window: Duration, limit: u32) -> Self {
        Self { window, limit, clients: Mutex::new(HashMap::new()) }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window(), config.limit)
    }

    /// Count a request from `ip`.
    pub fn check(&self, ip: IpAddr) -> RateDecision {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> RateDecision {
        let mut clients = self.clients.lock();

        if clients.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = clients.entry(ip).or_insert(ClientWindow { started: now, hits: 0 });
        if now.duration_since(entry.started) >= self.window {
            *entry = ClientWindow { started: now, hits: 0 };
        }
        entry.hits = entry.hits.saturating_add(1);

        RateDecision {
            allowed: entry.hits <= self.limit,
            limit: self.limit,
            remaining: self.limit.saturating_sub(entry.hits),
            reset: self.window.saturating_sub(now.duration_since(entry.started)),
            window: self.window,
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_millis().div_ceil(1000) as u64
}

/// Middleware counting every request against its peer address.
///
/// Requests without connection info (in-process callers) are not limited.
pub async fn enforce(State(limiter): State<Arc<RateLimiter>>, request: Request, next: Next) -> Response {
    let Some(ip) = request.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip()) else {
        return next.run(request).await;
    };

    let decision = limiter.check(ip);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::debug!(%ip, "rate limit exceeded");
        let mut response =
            (StatusCode::TOO_MANY_REQUESTS, "Too many requests, please try again later.").into_response();
        if let Ok(value) = HeaderValue::from_str(&ceil_secs(decision.reset).to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    };

    decision.apply_headers(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1));
    const OTHER: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 2));

    #[test]
    fn test_limit_within_window() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 2);
        let now = Instant::now();

        let first = limiter.check_at(CLIENT, now);
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);

        let second = limiter.check_at(CLIENT, now + Duration::from_secs(1));
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);

        let third = limiter.check_at(CLIENT, now + Duration::from_secs(2));
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);
        assert_eq!(third.reset, Duration::from_secs(58));
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(Duration::from_secs(10), 1);
        let now = Instant::now();

        assert!(limiter.check_at(CLIENT, now).allowed);
        assert!(!limiter.check_at(CLIENT, now + Duration::from_secs(5)).allowed);
        assert!(limiter.check_at(CLIENT, now + Duration::from_secs(10)).allowed);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        let now = Instant::now();

        assert!(limiter.check_at(CLIENT, now).allowed);
        assert!(!limiter.check_at(CLIENT, now).allowed);
        assert!(limiter.check_at(OTHER, now).allowed);
    }

    #[test]
    fn test_headers() {
        let decision = RateDecision {
            allowed: true,
            limit: 50,
            remaining: 49,
            reset: Duration::from_millis(59_500),
            window: Duration::from_secs(60),
        };
        let mut headers = HeaderMap::new();
        decision.apply_headers(&mut headers);

        assert_eq!(headers.get("ratelimit-policy").unwrap(), "50;w=60");
        assert_eq!(headers.get("ratelimit").unwrap(), "limit=50, remaining=49, reset=60");
    }
}
