// Whole-dataset snapshot cache, the dispatch-level tier
use crate::domain::model::DatasetKind;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A formatted snapshot as produced by one aggregation run.
#[derive(Debug, Clone)]
pub struct Computed {
    pub body: String,
    /// False for partial runs; those are handed back but never stored.
    pub cacheable: bool,
}

struct SnapshotEntry {
    body: Arc<str>,
    stored_at: Instant,
}

/// Maps each dataset to its last fully aggregated snapshot.
///
/// `ttl == None` keeps snapshots until explicitly invalidated.
pub struct ResourceCache {
    map: DashMap<DatasetKind, SnapshotEntry>,
    ttl: Option<Duration>,
}

impl ResourceCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            map: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn is_fresh(&self, entry: &SnapshotEntry) -> bool {
        self.ttl
            .map(|ttl| entry.stored_at.elapsed() < ttl)
            .unwrap_or(true)
    }

    pub fn get(&self, kind: DatasetKind) -> Option<Arc<str>> {
        if let Some(entry) = self.map.get(&kind) {
            if self.is_fresh(&entry) {
                return Some(entry.body.clone());
            }
            drop(entry);
            self.map.remove_if(&kind, |_, e| !self.is_fresh(e));
            tracing::debug!(dataset = %kind, "snapshot expired");
        }
        None
    }

    pub fn put(&self, kind: DatasetKind, body: impl Into<Arc<str>>) {
        self.map.insert(
            kind,
            SnapshotEntry {
                body: body.into(),
                stored_at: Instant::now(),
            },
        );
    }

    /// Return the cached snapshot or compute, store and return a new one.
    ///
    /// The map is never locked across `compute`, so two concurrent misses for
    /// the same dataset both compute and the later store wins.
    pub async fn get_or_compute<F, Fut, E>(&self, kind: DatasetKind, compute: F) -> Result<Arc<str>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Computed, E>>,
    {
        if let Some(hit) = self.get(kind) {
            tracing::debug!(dataset = %kind, "snapshot cache hit");
            return Ok(hit);
        }

        let computed = compute().await?;
        let body: Arc<str> = computed.body.into();
        if computed.cacheable {
            self.put(kind, body.clone());
        } else {
            tracing::warn!(dataset = %kind, "partial snapshot not cached");
        }
        Ok(body)
    }

    pub fn invalidate(&self, kind: DatasetKind) -> bool {
        self.map.remove(&kind).is_some()
    }

    pub fn invalidate_all(&self) {
        self.map.clear();
    }

    pub fn contains(&self, kind: DatasetKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn computed(body: &str) -> Result<Computed, std::convert::Infallible> {
        Ok(Computed {
            body: body.to_string(),
            cacheable: true,
        })
    }

    #[tokio::test]
    async fn test_read_is_idempotent_until_invalidated() {
        let cache = ResourceCache::new(None);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let body = cache
                .get_or_compute(DatasetKind::Parking, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    computed("first")
                })
                .await
                .unwrap();
            assert_eq!(&*body, "first");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(cache.invalidate(DatasetKind::Parking));
        let body = cache
            .get_or_compute(DatasetKind::Parking, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                computed("second")
            })
            .await
            .unwrap();
        assert_eq!(&*body, "second");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_partial_snapshot_is_not_stored() {
        let cache = ResourceCache::new(None);
        let body = cache
            .get_or_compute(DatasetKind::Cctv, || async {
                Ok::<_, std::convert::Infallible>(Computed {
                    body: "partial".to_string(),
                    cacheable: false,
                })
            })
            .await
            .unwrap();
        assert_eq!(&*body, "partial");
        assert!(!cache.contains(DatasetKind::Cctv));
    }

    #[tokio::test]
    async fn test_compute_error_leaves_cache_cold() {
        let cache = ResourceCache::new(None);
        let result = cache
            .get_or_compute(DatasetKind::Restaurant, || async { Err::<Computed, _>("boom") })
            .await;
        assert_eq!(result.unwrap_err(), "boom");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ttl_bound_snapshot_expires() {
        let cache = ResourceCache::new(Some(Duration::from_millis(20)));
        cache.put(DatasetKind::SmokingArea, "x");
        assert!(cache.contains(DatasetKind::SmokingArea));
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get(DatasetKind::SmokingArea).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_removes_exactly_one() {
        let cache = ResourceCache::new(None);
        cache.put(DatasetKind::Parking, "p");
        cache.put(DatasetKind::Restaurant, "r");
        assert!(cache.invalidate(DatasetKind::Parking));
        assert!(!cache.invalidate(DatasetKind::Parking));
        assert_eq!(cache.len(), 1);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
