//! Response caching with TTL expiry and LRU eviction.
//!
//! This crate caches successful read responses so repeated identical requests
//! skip the network and the rate limiter.

#![warn(missing_docs)]

mod cache;
mod config;
mod key;

pub use cache::{CacheEntry, CacheStats, RequestCache};
pub use config::{RequestCacheConfig, RequestCacheConfigBuilder};
pub use key::cache_key;
