//! Client code for the wayback gateway.
//!
//! This crate provides the archive retrieval pipeline: upstream transport,
//! availability probing, fetch pacing, proxy rotation, the fetch state
//! machine, and response dispatch with post-processing.

pub mod dispatch;
pub mod fetcher;
pub mod pacing;
pub mod probe;
pub mod proxy;
pub mod upstream;

pub use dispatch::{DefaultPostProcessor, PostProcessor, RequestContext, ResponseDispatcher};
pub use fetcher::{ArchiveFetcher, FetchOutcome, RetryPolicy};
pub use pacing::LoadDistributor;
pub use probe::{AvailabilityProbe, WaybackProbe};
pub use proxy::ProxyRotation;
pub use upstream::{HttpTransport, SnapshotTransport, TransportError, UpstreamConfig, UpstreamResponse};
