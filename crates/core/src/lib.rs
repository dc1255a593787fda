//! Core types and shared functionality for the wayback gateway.
//!
//! This crate provides:
//! - Bounded in-memory snapshot cache
//! - Client preferences and target dates
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod preferences;

pub use cache::{ArchivedResponse, CacheKey, MemoryCache, NullCache, WaybackCache};
pub use config::{GatewayConfig, ProxyEndpoint};
pub use error::Error;
pub use preferences::{ClientPreferences, TargetDate};
