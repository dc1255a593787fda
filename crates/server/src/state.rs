//! Process-wide services shared by every request.

use std::sync::Arc;

use waygate_client::{ArchiveFetcher, ResponseDispatcher};
use waygate_core::{Error, GatewayConfig};

use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<ArchiveFetcher>,
    pub dispatcher: ResponseDispatcher,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(fetcher: ArchiveFetcher, dispatcher: ResponseDispatcher, limiter: RateLimiter) -> Self {
        Self { fetcher: Arc::new(fetcher), dispatcher, limiter: Arc::new(limiter) }
    }

    /// Build every service once, at startup.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, Error> {
        Ok(Self::new(
            ArchiveFetcher::from_config(config)?,
            ResponseDispatcher::default(),
            RateLimiter::from_config(&config.rate_limit),
        ))
    }
}
