//! LRU Recency Tracker
//!
//! Tracks entry recency for the content store's internal eviction. Entries
//! are kept in access order (front = coldest); eviction candidates are
//! taken from the front until enough bytes are covered.

use crate::store::SegmentKey;
use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::time::Duration;

// =============================================================================
// Tracked Entry
// =============================================================================

/// Lightweight per-entry metadata for recency tracking
#[derive(Debug, Clone)]
pub struct TrackedEntry {
    /// Cache key
    pub key: SegmentKey,
    /// Stored size in bytes
    pub size_bytes: u64,
    /// Last access timestamp (Unix millis)
    pub last_accessed_ms: u64,
    /// Access count
    pub access_count: u64,
}

impl TrackedEntry {
    /// Create a fresh entry tracked as accessed now
    pub fn new(key: SegmentKey, size_bytes: u64) -> Self {
        Self {
            key,
            size_bytes,
            last_accessed_ms: Utc::now().timestamp_millis() as u64,
            access_count: 1,
        }
    }

    fn record_access(&mut self) {
        self.last_accessed_ms = Utc::now().timestamp_millis() as u64;
        self.access_count += 1;
    }
}

// =============================================================================
// LRU Tracker
// =============================================================================

/// Recency tracker for a single store
///
/// The map's insertion order is the recency order: re-inserting on access
/// moves an entry to the back (most recently used).
#[derive(Debug, Default)]
pub struct LruTracker {
    inner: RwLock<IndexMap<String, TrackedEntry>>,
}

impl LruTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new or replaced entry (moves to most-recently-used)
    pub fn track(&self, entry: TrackedEntry) {
        let key = entry.key.to_storage_key();
        let mut inner = self.inner.write();
        inner.shift_remove(&key);
        inner.insert(key, entry);
    }

    /// Record an access (moves to most-recently-used)
    pub fn access(&self, key: &SegmentKey) -> bool {
        let storage_key = key.to_storage_key();
        let mut inner = self.inner.write();
        if let Some(mut entry) = inner.shift_remove(&storage_key) {
            entry.record_access();
            inner.insert(storage_key, entry);
            true
        } else {
            false
        }
    }

    /// Stop tracking an entry
    pub fn remove(&self, key: &SegmentKey) -> Option<TrackedEntry> {
        self.inner.write().shift_remove(&key.to_storage_key())
    }

    /// Number of tracked entries
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the tracker is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Least-recently-used entries covering at least `bytes_needed`
    ///
    /// Walks from the front (coldest) and stops once enough bytes are
    /// accumulated. Returns fewer bytes than requested only when the
    /// tracker runs out of entries.
    pub fn eviction_candidates(&self, bytes_needed: u64) -> Vec<TrackedEntry> {
        let inner = self.inner.read();
        let mut selected = Vec::new();
        let mut covered = 0u64;

        for entry in inner.values() {
            if covered >= bytes_needed {
                break;
            }
            selected.push(entry.clone());
            covered += entry.size_bytes;
        }

        selected
    }

    /// Keys idle longer than `max_idle`
    pub fn stale(&self, max_idle: Duration) -> Vec<SegmentKey> {
        let now_ms = Utc::now().timestamp_millis() as u64;
        let cutoff_ms = now_ms.saturating_sub(max_idle.as_millis() as u64);
        self.inner
            .read()
            .values()
            .filter(|e| e.last_accessed_ms < cutoff_ms)
            .map(|e| e.key.clone())
            .collect()
    }

    /// All tracked keys in recency order (coldest first)
    pub fn keys(&self) -> Vec<SegmentKey> {
        self.inner.read().values().map(|e| e.key.clone()).collect()
    }

    /// Clear all tracked entries
    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(uri: &str, index: u32, size: u64) -> TrackedEntry {
        TrackedEntry::new(SegmentKey::new(uri, index), size)
    }

    #[test]
    fn test_track_and_access() {
        let tracker = LruTracker::new();

        tracker.track(entry("video://a", 0, 1000));
        assert_eq!(tracker.len(), 1);

        assert!(tracker.access(&SegmentKey::new("video://a", 0)));
        assert!(!tracker.access(&SegmentKey::new("video://a", 99)));
    }

    #[test]
    fn test_eviction_candidates_lru_order() {
        let tracker = LruTracker::new();

        tracker.track(entry("video://a", 0, 100));
        tracker.track(entry("video://a", 1, 100));
        tracker.track(entry("video://a", 2, 100));

        // Touch segment 0 so it becomes most recently used
        tracker.access(&SegmentKey::new("video://a", 0));

        let candidates = tracker.eviction_candidates(150);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].key.index, 1);
        assert_eq!(candidates[1].key.index, 2);
    }

    #[test]
    fn test_eviction_candidates_exhaustion() {
        let tracker = LruTracker::new();
        tracker.track(entry("video://a", 0, 100));

        // More bytes requested than tracked: returns everything
        let candidates = tracker.eviction_candidates(10_000);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_remove() {
        let tracker = LruTracker::new();
        tracker.track(entry("video://a", 0, 1000));

        let removed = tracker.remove(&SegmentKey::new("video://a", 0)).unwrap();
        assert_eq!(removed.size_bytes, 1000);
        assert!(tracker.is_empty());
        assert!(tracker.remove(&SegmentKey::new("video://a", 0)).is_none());
    }

    #[test]
    fn test_stale_detection() {
        let tracker = LruTracker::new();

        let mut old = entry("video://a", 0, 100);
        old.last_accessed_ms -= 10_000;
        tracker.track(old);
        tracker.track(entry("video://a", 1, 100));

        let stale = tracker.stale(Duration::from_secs(5));
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].index, 0);

        // Nothing is stale at a generous age
        assert!(tracker.stale(Duration::from_secs(3600)).is_empty());
    }

    #[test]
    fn test_clear() {
        let tracker = LruTracker::new();
        tracker.track(entry("video://a", 0, 100));
        tracker.track(entry("video://b", 0, 100));

        tracker.clear();
        assert!(tracker.is_empty());
    }
}
