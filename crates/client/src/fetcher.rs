//! Archive retrieval pipeline.
//!
//! A request walks: cache lookup, availability probe, pacing slot, then an
//! attempt loop. Attempt 0 goes direct; later attempts take the next proxy in
//! the shared rotation. Transport failures without a response are retried with
//! linear backoff; any HTTP status ends the loop. Every wait races the
//! request's cancellation token, and a cancelled request resolves to
//! [`FetchOutcome::Aborted`] without producing anything to write.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use waygate_core::{ArchivedResponse, CacheKey, ClientPreferences, Error, GatewayConfig, TargetDate, WaybackCache};

use crate::pacing::LoadDistributor;
use crate::probe::{AvailabilityProbe, WaybackProbe};
use crate::proxy::ProxyRotation;
use crate::upstream::{HttpTransport, SnapshotTransport, TransportError, UpstreamConfig, UpstreamResponse, snapshot_url};

/// Per-request pipeline lines go to `info` when request logging is on, `debug` otherwise.
macro_rules! request_log {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

/// Retry budget for transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Backoff after attempt `n` is `backoff_base * (n + 1)`.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, backoff_base: Duration::from_millis(300) }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * (attempt + 1)
    }
}

/// How a single archive request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(ArchivedResponse),
    /// Probe found no snapshot, or the snapshot fetch answered 404.
    NotArchived,
    /// The archive answered with this non-404 error status.
    UpstreamStatus(u16),
    /// Send the client to the live site instead.
    Redirect(String),
    /// Retry budget exhausted without any HTTP response.
    Unreachable,
    /// 2xx without a `Content-Type`; not cached.
    MissingContentType,
    /// The client went away. Nothing may be written.
    Aborted,
}

/// The retrieval state machine and the service objects it drives.
pub struct ArchiveFetcher {
    cache: Arc<dyn WaybackCache>,
    probe: Arc<dyn AvailabilityProbe>,
    transport: Arc<dyn SnapshotTransport>,
    distributor: LoadDistributor,
    proxies: ProxyRotation,
    policy: RetryPolicy,
    archive_host: String,
    log_requests: bool,
}

impl ArchiveFetcher {
    pub fn new(
        cache: Arc<dyn WaybackCache>, probe: Arc<dyn AvailabilityProbe>, transport: Arc<dyn SnapshotTransport>,
        distributor: LoadDistributor, proxies: ProxyRotation, archive_host: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            probe,
            transport,
            distributor,
            proxies,
            policy: RetryPolicy::default(),
            archive_host: archive_host.into(),
            log_requests: false,
        }
    }

    /// Wire up the production pipeline from configuration.
    ///
    /// # Errors
    ///
    /// Fails when a proxy entry is malformed or an HTTP client cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, Error> {
        let proxies = config.proxy_endpoints().map_err(|e| Error::InvalidProxy(e.to_string()))?;
        let transport = HttpTransport::new(&UpstreamConfig::from_gateway(config), &proxies)?;
        let probe = WaybackProbe::new(transport.direct_client(), &config.availability_host);

        tracing::info!(
            proxies = proxies.len(),
            request_delay_ms = config.request_delay_ms,
            caching = config.caching.enabled,
            "archive fetcher ready"
        );

        let fetcher = Self::new(
            waygate_core::cache::from_config(&config.caching),
            Arc::new(probe),
            Arc::new(transport),
            LoadDistributor::new(config.request_delay()),
            ProxyRotation::new(proxies),
            config.archive_host.clone(),
        );
        Ok(fetcher.with_request_logging(config.log_new_requests))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    /// Retrieve `url` as archived around `date`.
    ///
    /// # Errors
    ///
    /// Only conditions the pipeline cannot classify: an empty URL or a fatal
    /// transport error (e.g. a request that cannot be built).
    pub async fn fetch_archive(
        &self, date: TargetDate, url: &str, cancel: &CancellationToken, prefs: &ClientPreferences,
    ) -> Result<FetchOutcome, Error> {
        if url.is_empty() {
            return Err(Error::InvalidInput("target URL is empty".into()));
        }

        let key = CacheKey::new(&date, url);
        if let Some(hit) = self.cache.try_get(&key) {
            tracing::debug!(%key, "cache hit");
            return Ok(FetchOutcome::Success(hit));
        }

        if cancel.is_cancelled() {
            return Ok(FetchOutcome::Aborted);
        }

        let timestamp = date.wayback_timestamp();
        request_log!(self.log_requests, url, date = %timestamp, "new request");
        if !date.is_calendar_date() {
            tracing::debug!(date = %timestamp, "target date is not on the calendar; archive picks the closest capture");
        }

        let archived = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(FetchOutcome::Aborted),
            archived = self.probe.is_archived(url) => archived,
        };
        if !archived {
            return Ok(self.terminal(FetchOutcome::NotArchived, url, prefs));
        }

        // A slot claimed by a request that is then cancelled stays spent.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(FetchOutcome::Aborted),
            _ = self.distributor.reserve_slot() => {}
        }

        let snapshot = snapshot_url(&self.archive_host, &date, url);
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Ok(FetchOutcome::Aborted);
            }

            let proxy = if attempt == 0 { None } else { self.proxies.next_proxy() };

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(FetchOutcome::Aborted),
                result = self.transport.fetch(&snapshot, proxy) => result,
            };

            match result {
                Ok(response) => {
                    request_log!(
                        self.log_requests,
                        url,
                        date = %timestamp,
                        proxy = proxy.map(|p| p.host()),
                        attempt,
                        "fetched snapshot"
                    );
                    return Ok(self.store(key, response));
                }
                Err(TransportError::Unreachable(reason)) => {
                    if attempt >= self.policy.max_retries {
                        tracing::warn!(url, attempts = attempt + 1, %reason, "archive unreachable, giving up");
                        return Ok(self.terminal(FetchOutcome::Unreachable, url, prefs));
                    }

                    let wait = self.policy.backoff(attempt);
                    tracing::debug!(url, attempt, %reason, wait_ms = wait.as_millis() as u64, "retrying after backoff");

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(FetchOutcome::Aborted),
                        _ = tokio::time::sleep(wait) => {}
                    }
                    attempt += 1;
                }
                Err(TransportError::Status { status: 404 }) => {
                    return Ok(self.terminal(FetchOutcome::NotArchived, url, prefs));
                }
                Err(TransportError::Status { status }) => {
                    tracing::debug!(url, status, "archive answered with error status");
                    return Ok(self.terminal(FetchOutcome::UpstreamStatus(status), url, prefs));
                }
                Err(TransportError::Fatal(reason)) => return Err(Error::Upstream(reason)),
            }
        }
    }

    fn store(&self, key: CacheKey, response: UpstreamResponse) -> FetchOutcome {
        let Some(content_type) = response.content_type else {
            tracing::warn!(%key, "archive response has no content type");
            return FetchOutcome::MissingContentType;
        };

        let archived = ArchivedResponse::new(content_type, response.body);
        self.cache.add(key, archived.clone());
        FetchOutcome::Success(archived)
    }

    fn terminal(&self, outcome: FetchOutcome, url: &str, prefs: &ClientPreferences) -> FetchOutcome {
        if prefs.fallback_to_current {
            return FetchOutcome::Redirect(url.to_string());
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use tokio::time::Instant;
    use waygate_core::{MemoryCache, NullCache, ProxyEndpoint};

    struct FixedProbe {
        archived: bool,
        calls: AtomicUsize,
    }

    impl FixedProbe {
        fn new(archived: bool) -> Arc<Self> {
            Arc::new(Self { archived, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl AvailabilityProbe for FixedProbe {
        async fn is_archived(&self, _url: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.archived
        }
    }

    enum Step {
        Respond(Result<UpstreamResponse, TransportError>),
        Hang,
    }

    #[derive(Default)]
    struct ScriptedTransport {
        steps: Mutex<VecDeque<Step>>,
        calls: Mutex<Vec<(String, Option<ProxyEndpoint>)>>,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self { steps: Mutex::new(steps.into()), calls: Mutex::default() })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        fn proxies_used(&self) -> Vec<Option<String>> {
            self.calls.lock().iter().map(|(_, p)| p.as_ref().map(|p| p.host().to_string())).collect()
        }
    }

    #[async_trait]
    impl SnapshotTransport for ScriptedTransport {
        async fn fetch(&self, url: &str, proxy: Option<&ProxyEndpoint>) -> Result<UpstreamResponse, TransportError> {
            self.calls.lock().push((url.to_string(), proxy.cloned()));
            let step = self.steps.lock().pop_front();
            match step {
                Some(Step::Respond(result)) => result,
                Some(Step::Hang) | None => std::future::pending().await,
            }
        }
    }

    fn ok(content_type: &str, body: &'static [u8]) -> Step {
        Step::Respond(Ok(UpstreamResponse { content_type: Some(content_type.into()), body: Bytes::from_static(body) }))
    }

    fn unreachable() -> Step {
        Step::Respond(Err(TransportError::Unreachable("connection reset".into())))
    }

    fn status(status: u16) -> Step {
        Step::Respond(Err(TransportError::Status { status }))
    }

    fn proxies(n: u16) -> ProxyRotation {
        ProxyRotation::new((0..n).map(|i| ProxyEndpoint::new(format!("proxy{i}"), 3128)).collect())
    }

    fn fetcher(
        cache: Arc<dyn WaybackCache>, probe: Arc<FixedProbe>, transport: Arc<ScriptedTransport>,
        rotation: ProxyRotation,
    ) -> ArchiveFetcher {
        ArchiveFetcher::new(
            cache,
            probe,
            transport,
            LoadDistributor::new(Duration::from_millis(250)),
            rotation,
            "https://web.archive.org",
        )
    }

    fn fallback() -> ClientPreferences {
        ClientPreferences { fallback_to_current: true, ..Default::default() }
    }

    const URL: &str = "http://example.com/";

    async fn fetch_with(fetcher: &ArchiveFetcher, prefs: &ClientPreferences) -> FetchOutcome {
        fetcher.fetch_archive(TargetDate::default(), URL, &CancellationToken::new(), prefs).await.unwrap()
    }

    async fn fetch_default(fetcher: &ArchiveFetcher) -> FetchOutcome {
        fetch_with(fetcher, &ClientPreferences::default()).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_cached() {
        let cache = Arc::new(MemoryCache::new(1024));
        let transport = ScriptedTransport::new(vec![ok("text/html", b"<p>hi</p>")]);
        let fetcher = fetcher(cache.clone(), FixedProbe::new(true), transport.clone(), proxies(0));

        let date = TargetDate::default();
        let outcome = fetcher.fetch_archive(date, URL, &CancellationToken::new(), &Default::default()).await.unwrap();

        let expected = ArchivedResponse::new("text/html", Bytes::from_static(b"<p>hi</p>"));
        assert_eq!(outcome, FetchOutcome::Success(expected.clone()));
        assert_eq!(cache.try_get(&CacheKey::new(&date, URL)), Some(expected));
        assert_eq!(transport.calls.lock()[0].0, "https://web.archive.org/web/20050101000000id_/http://example.com/");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_probe_and_fetch() {
        let cache = Arc::new(MemoryCache::new(1024));
        let date = TargetDate::new(3, 4, 2001);
        cache.add(CacheKey::new(&date, URL), ArchivedResponse::new("image/png", vec![1u8, 2, 3]));

        let probe = FixedProbe::new(true);
        let transport = ScriptedTransport::new(vec![]);
        let fetcher = fetcher(cache, probe.clone(), transport.clone(), proxies(0));

        let outcome = fetcher.fetch_archive(date, URL, &CancellationToken::new(), &Default::default()).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Success(r) if r.content_type == "image/png"));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_archived_skips_fetch() {
        let transport = ScriptedTransport::new(vec![ok("text/html", b"")]);
        let fetcher = fetcher(Arc::new(NullCache), FixedProbe::new(false), transport.clone(), proxies(0));

        let outcome = fetch_default(&fetcher).await;

        assert_eq!(outcome, FetchOutcome::NotArchived);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_archived_with_fallback_redirects() {
        let fetcher = fetcher(Arc::new(NullCache), FixedProbe::new(false), ScriptedTransport::new(vec![]), proxies(0));

        let outcome = fetch_with(&fetcher, &fallback()).await;

        assert_eq!(outcome, FetchOutcome::Redirect(URL.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_404_is_not_archived_without_retry() {
        let transport = ScriptedTransport::new(vec![status(404)]);
        let fetcher = fetcher(Arc::new(NullCache), FixedProbe::new(true), transport.clone(), proxies(2));

        let outcome = fetch_default(&fetcher).await;

        assert_eq!(outcome, FetchOutcome::NotArchived);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_status_is_forwarded() {
        let transport = ScriptedTransport::new(vec![status(503)]);
        let fetcher = fetcher(Arc::new(NullCache), FixedProbe::new(true), transport.clone(), proxies(0));

        let outcome = fetch_default(&fetcher).await;

        assert_eq!(outcome, FetchOutcome::UpstreamStatus(503));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_with_fallback_redirects() {
        let transport = ScriptedTransport::new(vec![status(500)]);
        let fetcher = fetcher(Arc::new(NullCache), FixedProbe::new(true), transport, proxies(0));

        let outcome = fetch_with(&fetcher, &fallback()).await;

        assert_eq!(outcome, FetchOutcome::Redirect(URL.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_rotate_through_proxies() {
        let transport =
            ScriptedTransport::new(vec![unreachable(), unreachable(), unreachable(), ok("text/plain", b"found")]);
        let fetcher = fetcher(Arc::new(NullCache), FixedProbe::new(true), transport.clone(), proxies(2));

        let start = Instant::now();
        let outcome = fetch_default(&fetcher).await;

        assert!(matches!(outcome, FetchOutcome::Success(_)));
        assert_eq!(
            transport.proxies_used(),
            [None, Some("proxy0".to_string()), Some("proxy1".to_string()), Some("proxy0".to_string())]
        );
        // 300 + 600 + 900 ms of backoff
        assert!(Instant::now() - start >= Duration::from_millis(1800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_continues_across_requests() {
        let transport = ScriptedTransport::new(vec![
            unreachable(),
            ok("text/plain", b"first"),
            unreachable(),
            ok("text/plain", b"second"),
        ]);
        let fetcher = fetcher(Arc::new(NullCache), FixedProbe::new(true), transport.clone(), proxies(3));

        assert!(matches!(fetch_default(&fetcher).await, FetchOutcome::Success(_)));
        assert!(matches!(fetch_default(&fetcher).await, FetchOutcome::Success(_)));

        // the second request picks up where the first left the shared index
        assert_eq!(transport.proxies_used(), [None, Some("proxy0".to_string()), None, Some("proxy1".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_without_proxies_stay_direct() {
        let transport = ScriptedTransport::new(vec![unreachable(), ok("text/plain", b"found")]);
        let fetcher = fetcher(Arc::new(NullCache), FixedProbe::new(true), transport.clone(), proxies(0));

        let outcome = fetch_default(&fetcher).await;

        assert!(matches!(outcome, FetchOutcome::Success(_)));
        assert_eq!(transport.proxies_used(), [None, None]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhausted() {
        let transport = ScriptedTransport::new((0..4).map(|_| unreachable()).collect());
        let fetcher = fetcher(Arc::new(NullCache), FixedProbe::new(true), transport.clone(), proxies(1));

        let outcome = fetch_default(&fetcher).await;

        assert_eq!(outcome, FetchOutcome::Unreachable);
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhausted_with_fallback() {
        let transport = ScriptedTransport::new((0..4).map(|_| unreachable()).collect());
        let fetcher = fetcher(Arc::new(NullCache), FixedProbe::new(true), transport, proxies(0));

        let outcome = fetch_with(&fetcher, &fallback()).await;

        assert_eq!(outcome, FetchOutcome::Redirect(URL.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_aborts_promptly() {
        let transport = ScriptedTransport::new((0..4).map(|_| unreachable()).collect());
        let fetcher = fetcher(Arc::new(NullCache), FixedProbe::new(true), transport.clone(), proxies(0));
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                // third failure lands at 900 ms; its backoff runs until 1800 ms
                tokio::time::sleep(Duration::from_millis(1000)).await;
                cancel.cancel();
            })
        };

        let start = Instant::now();
        let outcome = fetcher.fetch_archive(TargetDate::default(), URL, &cancel, &Default::default()).await.unwrap();
        let elapsed = Instant::now() - start;

        assert_eq!(outcome, FetchOutcome::Aborted);
        assert_eq!(transport.call_count(), 3);
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed < Duration::from_millis(1100));
        canceller.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_fetch_aborts() {
        let transport = ScriptedTransport::new(vec![Step::Hang]);
        let cache = Arc::new(MemoryCache::new(1024));
        let fetcher = fetcher(cache.clone(), FixedProbe::new(true), transport, proxies(0));
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            })
        };

        let outcome = fetcher.fetch_archive(TargetDate::default(), URL, &cancel, &Default::default()).await.unwrap();

        assert_eq!(outcome, FetchOutcome::Aborted);
        assert!(cache.is_empty());
        canceller.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_does_nothing() {
        let probe = FixedProbe::new(true);
        let transport = ScriptedTransport::new(vec![ok("text/html", b"")]);
        let fetcher = fetcher(Arc::new(NullCache), probe.clone(), transport.clone(), proxies(0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = fetcher.fetch_archive(TargetDate::default(), URL, &cancel, &Default::default()).await.unwrap();

        assert_eq!(outcome, FetchOutcome::Aborted);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_content_type_not_cached() {
        let cache = Arc::new(MemoryCache::new(1024));
        let transport = ScriptedTransport::new(vec![Step::Respond(Ok(UpstreamResponse {
            content_type: None,
            body: Bytes::from_static(b"?"),
        }))]);
        let fetcher = fetcher(cache.clone(), FixedProbe::new(true), transport, proxies(0));

        let outcome = fetch_default(&fetcher).await;

        assert_eq!(outcome, FetchOutcome::MissingContentType);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_transport_error_propagates() {
        let transport = ScriptedTransport::new(vec![Step::Respond(Err(TransportError::Fatal("builder".into())))]);
        let fetcher = fetcher(Arc::new(NullCache), FixedProbe::new(true), transport, proxies(0));

        let err = fetcher
            .fetch_archive(TargetDate::default(), URL, &CancellationToken::new(), &Default::default())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "UPSTREAM_FATAL");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_url_rejected() {
        let fetcher = fetcher(Arc::new(NullCache), FixedProbe::new(true), ScriptedTransport::new(vec![]), proxies(0));
        let err = fetcher
            .fetch_archive(TargetDate::default(), "", &CancellationToken::new(), &Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_fetches_are_paced() {
        let transport = ScriptedTransport::new(vec![ok("text/plain", b"a"), ok("text/plain", b"b")]);
        let fetcher = fetcher(Arc::new(NullCache), FixedProbe::new(true), transport, proxies(0));
        let cancel = CancellationToken::new();

        let start = Instant::now();
        fetcher.fetch_archive(TargetDate::default(), "http://a.example/", &cancel, &Default::default()).await.unwrap();
        fetcher.fetch_archive(TargetDate::default(), "http://b.example/", &cancel, &Default::default()).await.unwrap();

        assert!(Instant::now() - start >= Duration::from_millis(250));
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.backoff(0), Duration::from_millis(300));
        assert_eq!(policy.backoff(2), Duration::from_millis(900));
    }
}
