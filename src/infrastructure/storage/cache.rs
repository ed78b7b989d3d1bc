// Per-call-signature cache using DashMap
use crate::domain::model::CallSignature;
use chrono::{DateTime, Local};
use dashmap::DashMap;
use serde_json::Value;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
    stored_wall: DateTime<Local>,
}

/// Read-only view of one entry, used by `show_cached_data`.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub signature: CallSignature,
    pub stored_at: DateTime<Local>,
    pub remaining: Duration,
    pub value: Value,
}

/// Thread-safe, TTL-bound cache of raw upstream payloads keyed by call signature.
///
/// Expired entries are evicted lazily on lookup. There is no size bound.
pub struct SignatureCache {
    map: DashMap<CallSignature, CacheEntry>,
    ttl: Duration,
}

impl SignatureCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            map: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn lookup(&self, sig: &CallSignature) -> Option<Value> {
        if let Some(entry) = self.map.get(sig) {
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
            // guard must drop before remove, DashMap shards are not reentrant
            drop(entry);
            self.map
                .remove_if(sig, |_, e| e.stored_at.elapsed() >= self.ttl);
            tracing::debug!(key = %sig, "evicted expired signature entry");
        }
        None
    }

    pub fn store(&self, sig: CallSignature, value: Value) {
        self.map.insert(
            sig,
            CacheEntry {
                value,
                stored_at: Instant::now(),
                stored_wall: Local::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.map.clear();
    }

    /// Remove every entry whose signature satisfies `predicate`; returns how many went.
    pub fn clear_matching<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CallSignature) -> bool,
    {
        let before = self.map.len();
        self.map.retain(|sig, _| !predicate(sig));
        before.saturating_sub(self.map.len())
    }

    /// Live entries, sorted by signature. Expired entries are skipped, not evicted.
    pub fn entries(&self) -> Vec<EntryInfo> {
        let mut out: Vec<EntryInfo> = self
            .map
            .iter()
            .filter_map(|item| {
                let entry = item.value();
                let remaining = self.ttl.saturating_sub(entry.stored_at.elapsed());
                if remaining.is_zero() {
                    return None;
                }
                Some(EntryInfo {
                    signature: item.key().clone(),
                    stored_at: entry.stored_wall,
                    remaining,
                    value: entry.value.clone(),
                })
            })
            .collect();
        out.sort_by(|a, b| a.signature.cmp(&b.signature));
        out
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for SignatureCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DatasetKind, UpstreamQuery};
    use serde_json::json;

    fn sig(kind: DatasetKind, page: u32) -> CallSignature {
        UpstreamQuery::new(kind, page, 100).signature()
    }

    #[test]
    fn test_lookup_after_store_returns_value() {
        let cache = SignatureCache::new();
        let key = sig(DatasetKind::Parking, 1);
        assert!(cache.lookup(&key).is_none());

        cache.store(key.clone(), json!({"body": {"items": [1, 2]}}));
        assert_eq!(
            cache.lookup(&key),
            Some(json!({"body": {"items": [1, 2]}}))
        );
    }

    #[test]
    fn test_expired_entry_is_absent_and_evicted() {
        let cache = SignatureCache::with_ttl(Duration::from_millis(20));
        let key = sig(DatasetKind::Parking, 1);
        cache.store(key.clone(), json!({"ok": true}));
        assert_eq!(cache.len(), 1);

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.lookup(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_store_overwrites_same_signature() {
        let cache = SignatureCache::new();
        let key = sig(DatasetKind::Cctv, 3);
        cache.store(key.clone(), json!(1));
        cache.store(key.clone(), json!(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(&key), Some(json!(2)));
    }

    #[test]
    fn test_clear_matching_by_kind() {
        let cache = SignatureCache::new();
        cache.store(sig(DatasetKind::Parking, 1), json!(1));
        cache.store(sig(DatasetKind::Parking, 2), json!(2));
        cache.store(sig(DatasetKind::Restaurant, 1), json!(3));

        let removed = cache.clear_matching(|s| s.kind == DatasetKind::Parking);
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.lookup(&sig(DatasetKind::Restaurant, 1)).is_some());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entries_report_remaining_ttl_within_bounds() {
        let cache = SignatureCache::with_ttl(Duration::from_secs(60));
        cache.store(sig(DatasetKind::SmokingArea, 1), json!({}));
        let entries = cache.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].remaining <= Duration::from_secs(60));
        assert!(entries[0].remaining > Duration::from_secs(50));
    }

    #[test]
    fn test_entries_never_report_negative_ttl() {
        let cache = SignatureCache::with_ttl(Duration::from_millis(10));
        cache.store(sig(DatasetKind::SmokingArea, 1), json!({}));
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.entries().is_empty());
    }

    #[test]
    fn test_concurrent_stores_for_distinct_keys() {
        let cache = std::sync::Arc::new(SignatureCache::new());
        let handles: Vec<_> = (1..=8)
            .map(|page| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.store(sig(DatasetKind::Parking, page), json!(page)))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 8);
        assert_eq!(cache.lookup(&sig(DatasetKind::Parking, 5)), Some(json!(5)));
    }
}
