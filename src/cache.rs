use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::trace;

use crate::error::FetchError;
use crate::fetch::Fetcher;

type Slot = Arc<OnceCell<Arc<str>>>;

/// Run-scoped URL -> markup store in front of a [`Fetcher`].
///
/// Single-flight: concurrent first requests for one URL share a single fetch.
/// A failed fetch leaves the slot empty, so a later caller fetches again.
/// Entries are never evicted.
pub struct FetchCache<F> {
    fetcher: F,
    slots: Mutex<HashMap<String, Slot>>,
    hits: AtomicUsize,
    fetches: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub fetches: usize,
}

impl<F: Fetcher> FetchCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            slots: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub async fn get_or_fetch(&self, url: &str) -> Result<Arc<str>, FetchError> {
        let slot = self.slot(url);
        if let Some(markup) = slot.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(url, "cache hit");
            return Ok(Arc::clone(markup));
        }

        let markup = slot
            .get_or_try_init(|| async {
                self.fetches.fetch_add(1, Ordering::Relaxed);
                self.fetcher.fetch(url).await.map(Arc::<str>::from)
            })
            .await?;
        Ok(Arc::clone(markup))
    }

    pub fn stats(&self) -> CacheStats {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        CacheStats {
            entries: slots.values().filter(|s| s.initialized()).count(),
            hits: self.hits.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn slot(&self, url: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(url.to_string()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::fetch::stub::StubFetcher;

    const URL: &str = "https://a.test/wiki/Harry_Potter";

    #[tokio::test]
    async fn second_request_is_a_hit() {
        let cache = FetchCache::new(StubFetcher::new().page(URL, "<p>harry</p>"));

        let first = cache.get_or_fetch(URL).await.unwrap();
        let second = cache.get_or_fetch(URL).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.fetcher().calls(URL), 1);
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.fetches, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_share_one_fetch() {
        let fetcher = StubFetcher::new()
            .page(URL, "<p>harry</p>")
            .with_delay(Duration::from_millis(50));
        let cache = Arc::new(FetchCache::new(fetcher));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.get_or_fetch(URL).await }));
        }
        for h in handles {
            assert_eq!(&*h.await.unwrap().unwrap(), "<p>harry</p>");
        }

        assert_eq!(cache.fetcher().calls(URL), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = FetchCache::new(StubFetcher::new());

        let err = cache.get_or_fetch(URL).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(cache.get_or_fetch(URL).await.is_err());

        assert_eq!(cache.fetcher().calls(URL), 2);
        assert_eq!(cache.stats().entries, 0);
    }
}
