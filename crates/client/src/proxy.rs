//! Process-wide round-robin over the configured proxy pool.

use std::sync::atomic::{AtomicUsize, Ordering};

use waygate_core::ProxyEndpoint;

/// Rotating index into an ordered proxy list.
///
/// The index is shared by every request, so consecutive retries anywhere in
/// the process walk the pool in order.
#[derive(Debug, Default)]
pub struct ProxyRotation {
    proxies: Vec<ProxyEndpoint>,
    next: AtomicUsize,
}

impl ProxyRotation {
    pub fn new(proxies: Vec<ProxyEndpoint>) -> Self {
        Self { proxies, next: AtomicUsize::new(0) }
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Take the next proxy in rotation, or `None` when the pool is empty.
    pub fn next_proxy(&self) -> Option<&ProxyEndpoint> {
        if self.proxies.is_empty() {
            return None;
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        self.proxies.get(idx % self.proxies.len())
    }
}
