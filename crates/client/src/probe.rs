//! Availability probe against the archive's metadata API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::upstream::availability_endpoint;

/// Whether the archive holds any snapshot for a URL.
///
/// Never fails: every transport or decoding problem narrows to `false`.
#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    async fn is_archived(&self, url: &str) -> bool;
}

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    archived_snapshots: Option<Map<String, Value>>,
}

/// Probe backed by `GET {host}/wayback/available?url=...`.
#[derive(Debug, Clone)]
pub struct WaybackProbe {
    http: Client,
    endpoint: String,
}

impl WaybackProbe {
    pub fn new(http: Client, availability_host: &str) -> Self {
        Self { http, endpoint: availability_endpoint(availability_host) }
    }
}

#[async_trait]
impl AvailabilityProbe for WaybackProbe {
    async fn is_archived(&self, url: &str) -> bool {
        let response = match self.http.get(&self.endpoint).query(&[("url", url)]).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::debug!(url, status = response.status().as_u16(), "availability query rejected");
                return false;
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "availability query failed");
                return false;
            }
        };

        match response.json::<AvailabilityResponse>().await {
            Ok(body) => body.archived_snapshots.is_some_and(|snapshots| !snapshots.is_empty()),
            Err(e) => {
                tracing::debug!(url, error = %e, "malformed availability response");
                false
            }
        }
    }
}
