//! Typed, TTL-bounded caches.
//!
//! A cache instance holds exactly one value type, so reads never need a
//! runtime type check. Implementations must be safe to share between
//! concurrent callers.

mod memory;
mod redis_cache;

use std::time::Duration;

use async_trait::async_trait;

use common::AppResult;
use domain::AccountId;

pub use self::memory::MemoryCache;
pub use self::redis_cache::RedisCache;

/// Key prefix for cached accounts
pub const CACHE_PREFIX_ACCOUNT: &str = "account:";

/// Cache key for an account
pub fn account_key(id: AccountId) -> String {
    format!("{}{}", CACHE_PREFIX_ACCOUNT, id)
}

/// Key-value store with per-entry time-to-live.
///
/// Entries observed after their expiry are reported absent.
#[async_trait]
pub trait Cache<V>: Send + Sync
where
    V: Send + Sync + 'static,
{
    /// Get a live value, or `None` when absent or expired
    async fn get(&self, key: &str) -> AppResult<Option<V>>;

    /// Store a value, replacing any previous entry; it expires after `ttl`
    async fn set(&self, key: &str, value: V, ttl: Duration) -> AppResult<()>;

    /// Remove an entry; no-op when absent
    async fn delete(&self, key: &str) -> AppResult<()>;
}
