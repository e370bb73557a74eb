//! Read-through tenant configuration cache
//!
//! The event submission path looks the tenant up on every request; this cache
//! keeps the hot entries local with a TTL. Expiry runs lazily on read.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::config::TenantConfig;
use crate::id::TenantId;

struct CachedEntry {
    config: TenantConfig,
    inserted: Instant,
}

/// TTL-bounded tenant configuration cache.
///
/// Entries expire `ttl_secs` after insertion; expired entries are evicted on
/// the read that observes them.
pub struct TenantCache {
    cache: RwLock<HashMap<String, CachedEntry>>,
    ttl: Duration,
}

impl TenantCache {
    /// Create a cache whose entries live for `ttl_secs` seconds.
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Insert or refresh a tenant's configuration.
    pub fn set(&self, config: TenantConfig) {
        let key = config.tenant.key();
        self.cache.write().insert(
            key,
            CachedEntry {
                config,
                inserted: Instant::now(),
            },
        );
    }

    /// Look up a tenant, evicting the entry if it has expired.
    pub fn get(&self, tid: &TenantId) -> Option<TenantConfig> {
        let key = tid.key();
        {
            let cache = self.cache.read();
            match cache.get(&key) {
                Some(entry) if entry.inserted.elapsed() <= self.ttl => {
                    return Some(entry.config.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        self.cache.write().remove(&key);
        None
    }

    /// Drop a tenant's entry, if present.
    pub fn invalidate(&self, tid: &TenantId) {
        self.cache.write().remove(&tid.key());
    }

    /// Number of entries currently held, including not-yet-evicted expired ones.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}
