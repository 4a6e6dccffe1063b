//! Result cache for cacheable tools.
//!
//! Keys are `(tool id, SHA-256 of the canonical JSON params)`, so two
//! parameter sets that differ only in key order share an entry. Expiry is
//! lazy: an expired entry is removed on the read that finds it, and the
//! background sweeper removes whatever is never read again.

use super::clock;
use crate::config::CachePolicy;
use conductor_domain::{ToolParams, params_digest};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Identifies a cached tool result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub tool_id: String,
    /// Hex SHA-256 of the canonical parameters
    pub digest: String,
}

impl CacheKey {
    pub fn new(tool_id: &str, params: &ToolParams) -> Self {
        Self {
            tool_id: tool_id.to_string(),
            digest: params_digest(params),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    created_at: Instant,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Counters exposed on the operational surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub hit_rate: f64,
}

pub struct ResultCache {
    policy: CachePolicy,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

impl ResultCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Fresh value for `(tool_id, params)`, if any.
    pub fn get(&self, tool_id: &str, params: &ToolParams) -> Option<Value> {
        let key = CacheKey::new(tool_id, params);
        let now = clock::now();

        {
            let entries = self.entries.read();
            match entries.get(&key) {
                Some(entry) if !entry.is_expired(now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        // Expired: upgrade to a write lock and drop it, unless a concurrent
        // put refreshed it in between.
        let mut entries = self.entries.write();
        if entries.get(&key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a value for `ttl` (capped at the policy's max TTL).
    pub fn put(&self, tool_id: &str, params: &ToolParams, value: Value, ttl: Duration) {
        let ttl = ttl.min(self.policy.max_ttl);
        if ttl.is_zero() {
            return;
        }
        let now = clock::now();
        let entry = CacheEntry {
            value,
            created_at: now,
            expires_at: now + ttl,
        };
        self.entries
            .write()
            .insert(CacheKey::new(tool_id, params), entry);
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove expired entries and anything older than the stale horizon.
    /// Returns how many entries were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let stale_after = self.policy.stale_after();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| {
            !entry.is_expired(now) && now.saturating_duration_since(entry.created_at) < stale_after
        });
        let removed = before - entries.len();
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, remaining = entries.len(), "Cache sweep");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            entries: self.len(),
            hits,
            misses,
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}
