//! Expiry Sweeper
//!
//! Background task that periodically reclaims expired context entries.
//! Lazy expiry already keeps expired entries unobservable; the sweeper only
//! frees their memory earlier.

use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info};

use super::ContextCache;

/// Background expiry sweep task
pub struct ExpirySweeper<V: Clone + Send + Sync + 'static> {
    cache: ContextCache<V>,
    interval: Duration,
}

impl<V: Clone + Send + Sync + 'static> ExpirySweeper<V> {
    /// Create a new sweeper
    pub fn new(cache: ContextCache<V>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    /// Run the sweeper (should be spawned as a task)
    pub async fn run(self) {
        let mut ticker = interval(self.interval);
        info!("Expiry sweeper started, interval: {:?}", self.interval);

        loop {
            ticker.tick().await;
            let removed = self.cache.purge_expired();
            if removed > 0 {
                debug!(removed = removed, "Swept expired context entries");
            }
        }
    }

    /// Spawn the sweeper as a background task
    pub fn spawn(cache: ContextCache<V>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let sweeper = Self::new(cache, interval);
        tokio::spawn(sweeper.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CacheConfig;

    #[tokio::test]
    async fn test_sweeper_reclaims_expired_entries() {
        let cache: ContextCache<String> = ContextCache::new(CacheConfig::default()).unwrap();
        cache.set("a", "1".to_string(), 0.5, Some(Duration::from_millis(10)));
        cache.set("b", "2".to_string(), 0.5, Some(Duration::from_millis(10)));

        let handle = ExpirySweeper::spawn(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        // The sweep already reclaimed both entries without any cache access
        assert_eq!(cache.purge_expired(), 0);
        assert!(cache.is_empty());
    }
}
