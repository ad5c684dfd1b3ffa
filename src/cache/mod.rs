// Cache module for GitHub API responses.
// Persists responses across runs so repeated reports spend less of the rate limit.

pub mod gateway;
pub mod key;
pub mod paths;
pub mod store;

pub use gateway::{
    CachingGateway, DEFAULT_TTL_SECS, GatewayOptions, GatewayStats, ReadFailurePolicy,
};
pub use key::{CacheKey, fingerprint};
pub use paths::DEFAULT_NAMESPACE;
pub use store::{CachedData, FileStore, KeyValueStore, MemoryStore};
