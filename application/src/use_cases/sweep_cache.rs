//! Cache sweeper
//!
//! Lazy expiry only removes entries that are read again; this loop bounds
//! the memory held by everything else.

use crate::engine::{ResultCache, clock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct CacheSweeper {
    cache: Arc<ResultCache>,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(cache: Arc<ResultCache>) -> Self {
        let interval = cache.policy().sweep_interval;
        Self { cache, interval }
    }

    /// Sweep now; returns the number of removed entries.
    pub fn sweep_once(&self) -> usize {
        self.cache.sweep(clock::now())
    }

    pub async fn run(&self, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        // The first tick fires immediately; nothing to sweep at startup
        interval.tick().await;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    self.sweep_once();
                }
            }
        }
        debug!("Cache sweeper stopped");
    }

    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(token).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CachePolicy;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_background_sweep_removes_expired() {
        let cache = Arc::new(ResultCache::new(CachePolicy {
            sweep_interval: Duration::from_secs(60),
            ..CachePolicy::default()
        }));
        let params = json!({"zip": "94110"}).as_object().cloned().unwrap();
        cache.put("comps", &params, json!(1), Duration::from_secs(30));

        let token = CancellationToken::new();
        let handle = Arc::new(CacheSweeper::new(cache.clone())).spawn(token.clone());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(cache.is_empty());

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_once_keeps_fresh_entries() {
        let cache = Arc::new(ResultCache::default());
        let params = json!({}).as_object().cloned().unwrap();
        cache.put("comps", &params, json!(1), Duration::from_secs(30));

        let sweeper = CacheSweeper::new(cache.clone());
        assert_eq!(sweeper.sweep_once(), 0);
        assert_eq!(cache.len(), 1);
    }
}
