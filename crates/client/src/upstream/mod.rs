//! Upstream transport to the archive.
//!
//! All requests look like a desktop browser navigation and carry the
//! configured `Cookie` header. One reqwest client is built per proxy at
//! startup, next to the direct client, so picking a route is a map lookup.

pub mod error;
pub mod url;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};

use waygate_core::{Error, GatewayConfig, ProxyEndpoint};

pub use error::TransportError;
pub use url::{availability_endpoint, snapshot_url};

/// Browser navigation headers sent with every upstream request.
const BROWSER_HEADERS: [(&str, &str); 11] = [
    ("cache-control", "max-age=0"),
    ("accept-language", "*"),
    ("dnt", "1"),
    ("priority", "u=0, i"),
    ("sec-ch-ua", "\"Google Chrome\";v=\"129\", \"Not:A-Brand\";v=\"8\", \"Chromium\";v=\"129\""),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "Windows"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "same-origin"),
    ("sec-fetch-user", "?0"),
];

/// Settings shared by every upstream client.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub user_agent: String,
    /// Forwarded as the `Cookie` header when non-empty.
    pub cookies: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl UpstreamConfig {
    pub fn from_gateway(config: &GatewayConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), cookies: config.cookies.clone(), timeout: config.timeout() }
    }
}

/// A successful upstream answer.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// One GET against the archive, optionally through a proxy.
#[async_trait]
pub trait SnapshotTransport: Send + Sync {
    async fn fetch(&self, url: &str, proxy: Option<&ProxyEndpoint>) -> Result<UpstreamResponse, TransportError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    direct: Client,
    proxied: HashMap<ProxyEndpoint, Client>,
}

impl HttpTransport {
    /// Build the direct client and one client per proxy.
    pub fn new(config: &UpstreamConfig, proxies: &[ProxyEndpoint]) -> Result<Self, Error> {
        let direct = build_client(config, None)?;
        let proxied = proxies
            .iter()
            .map(|proxy| Ok((proxy.clone(), build_client(config, Some(proxy))?)))
            .collect::<Result<HashMap<_, _>, Error>>()?;

        Ok(Self { direct, proxied })
    }

    /// The direct client, shared with the availability probe.
    pub fn direct_client(&self) -> Client {
        self.direct.clone()
    }

    fn client_for(&self, proxy: Option<&ProxyEndpoint>) -> Result<&Client, TransportError> {
        match proxy {
            None => Ok(&self.direct),
            Some(proxy) => self
                .proxied
                .get(proxy)
                .ok_or_else(|| TransportError::Fatal(format!("no client configured for proxy {proxy}"))),
        }
    }
}

#[async_trait]
impl SnapshotTransport for HttpTransport {
    async fn fetch(&self, url: &str, proxy: Option<&ProxyEndpoint>) -> Result<UpstreamResponse, TransportError> {
        let client = self.client_for(proxy)?;
        let response = client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status { status: status.as_u16() });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(String::from);

        let body = response.bytes().await?;

        Ok(UpstreamResponse { content_type, body })
    }
}

fn default_headers(config: &UpstreamConfig) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    for (name, value) in BROWSER_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    if !config.cookies.is_empty() {
        let cookie = HeaderValue::from_str(&config.cookies)
            .map_err(|e| Error::InvalidInput(format!("cookies are not a valid header value: {e}")))?;
        headers.insert(header::COOKIE, cookie);
    }

    Ok(headers)
}

fn build_client(config: &UpstreamConfig, proxy: Option<&ProxyEndpoint>) -> Result<Client, Error> {
    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(default_headers(config)?)
        .timeout(config.timeout)
        .use_rustls_tls()
        .gzip(true)
        .brotli(true)
        .deflate(true);

    if let Some(proxy) = proxy {
        let route = reqwest::Proxy::all(proxy.url()).map_err(|e| Error::InvalidProxy(format!("{proxy}: {e}")))?;
        builder = builder.proxy(route);
    } else {
        builder = builder.no_proxy();
    }

    builder.build().map_err(|e| Error::ClientBuild(format!("failed to build HTTP client: {e}")))
}
