//! Per-run memoization of domain verdicts.

use crate::core::models::DomainVerdict;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Domain → verdict map shared by every probe in one orchestration call.
///
/// The mutex only guards the map of slots. Each slot is a `OnceCell`, so
/// concurrent callers for the same domain wait on a single resolution and all
/// observe the first verdict written.
#[derive(Debug, Default)]
pub struct DomainCache {
    slots: Mutex<HashMap<String, Arc<OnceCell<DomainVerdict>>>>,
}

impl DomainCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, domain: &str) -> Arc<OnceCell<DomainVerdict>> {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(domain.to_lowercase()).or_default())
    }

    /// Returns the verdict for `domain`, running `resolve` only if no verdict
    /// exists and no other caller is already resolving it.
    pub async fn get_or_resolve<F, Fut>(&self, domain: &str, resolve: F) -> DomainVerdict
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DomainVerdict>,
    {
        let cell = self.slot(domain);
        cell.get_or_init(resolve).await.clone()
    }

    /// Copy of every settled verdict, keyed by lower-cased domain.
    pub fn snapshot(&self) -> HashMap<String, DomainVerdict> {
        let slots = self.slots.lock();
        slots
            .iter()
            .filter_map(|(domain, cell)| cell.get().map(|v| (domain.clone(), v.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().values().filter(|c| c.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_first_verdict_is_reused() {
        let cache = DomainCache::new();
        let first = cache
            .get_or_resolve("Example-Corp.com", || async {
                DomainVerdict::via_mx("example-corp.com", "mx1.example-corp.com.")
            })
            .await;
        let second = cache
            .get_or_resolve("example-corp.com", || async {
                DomainVerdict::unresolvable("example-corp.com")
            })
            .await;

        assert!(first.is_valid());
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.snapshot()["example-corp.com"].mail_host.as_deref(),
            Some("mx1.example-corp.com")
        );
    }

    #[tokio::test]
    async fn test_concurrent_callers_resolve_once() {
        let cache = Arc::new(DomainCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_resolve("bigcorp.com", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        DomainVerdict::via_address("bigcorp.com")
                    })
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_valid());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_snapshot_only_contains_settled_verdicts() {
        let cache = DomainCache::new();
        assert!(cache.is_empty());
        cache
            .get_or_resolve("nowhere.invalid", || async {
                DomainVerdict::unresolvable("nowhere.invalid")
            })
            .await;
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot["nowhere.invalid"].is_valid());
    }
}
