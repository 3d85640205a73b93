//! In-Memory Segment Store
//!
//! Volatile DashMap-backed implementation of the store trait with the same
//! internal LRU eviction as the disk store. Used by tests and by embedders
//! that want a RAM-only cache.

use crate::error::{Error, Result};
use crate::store::lru::{LruTracker, TrackedEntry};
use crate::store::{PutReceipt, SegmentKey, SegmentStore};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Volatile segment store backed by a concurrent map
pub struct MemoryStore {
    entries: DashMap<String, Bytes>,
    lru: LruTracker,
    size_bytes: AtomicU64,
    entry_count: AtomicU64,
    capacity_bytes: AtomicU64,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Create a store with the given capacity
    pub fn with_capacity(capacity_bytes: u64) -> Self {
        Self {
            entries: DashMap::new(),
            lru: LruTracker::new(),
            size_bytes: AtomicU64::new(0),
            entry_count: AtomicU64::new(0),
            capacity_bytes: AtomicU64::new(capacity_bytes),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::StoreClosed)
        } else {
            Ok(())
        }
    }

    fn remove_entry(&self, key: &SegmentKey) -> u64 {
        let storage_key = key.to_storage_key();
        let freed = match self.entries.remove(&storage_key) {
            Some((_, data)) => data.len() as u64,
            None => {
                self.lru.remove(key);
                return 0;
            }
        };
        self.lru.remove(key);
        self.entry_count.fetch_sub(1, Ordering::Relaxed);
        self.size_bytes.fetch_sub(freed, Ordering::Relaxed);
        freed
    }

    fn evict_for(&self, needed: u64, capacity: u64) -> (u64, u64) {
        let mut evicted_entries = 0u64;
        let mut evicted_bytes = 0u64;

        loop {
            let current = self.size_bytes.load(Ordering::Relaxed);
            if current + needed <= capacity {
                break;
            }

            let overshoot = (current + needed).saturating_sub(capacity);
            let candidates = self.lru.eviction_candidates(overshoot);
            if candidates.is_empty() {
                break;
            }

            for candidate in candidates {
                let freed = self.remove_entry(&candidate.key);
                if freed > 0 {
                    evicted_entries += 1;
                    evicted_bytes += freed;
                }
            }
        }

        (evicted_entries, evicted_bytes)
    }
}

#[async_trait]
impl SegmentStore for MemoryStore {
    async fn get(&self, key: &SegmentKey) -> Result<Option<Bytes>> {
        self.ensure_open()?;
        let data = self
            .entries
            .get(&key.to_storage_key())
            .map(|r| r.value().clone());
        if data.is_some() {
            self.lru.access(key);
        }
        Ok(data)
    }

    async fn put(&self, key: SegmentKey, data: Bytes) -> Result<PutReceipt> {
        self.ensure_open()?;

        let new_size = data.len() as u64;
        let capacity = self.capacity_bytes.load(Ordering::Relaxed);
        if new_size > capacity {
            return Err(Error::StoreOperation(format!(
                "segment of {} bytes exceeds store capacity {}",
                new_size, capacity
            )));
        }

        let replaced = self.remove_entry(&key);
        let (evicted_entries, evicted_bytes) = self.evict_for(new_size, capacity);

        self.entries.insert(key.to_storage_key(), data);
        self.lru.track(TrackedEntry::new(key, new_size));
        self.entry_count.fetch_add(1, Ordering::Relaxed);
        self.size_bytes.fetch_add(new_size, Ordering::Relaxed);

        Ok(PutReceipt {
            written_bytes: new_size,
            evicted_entries,
            evicted_bytes: evicted_bytes + replaced,
        })
    }

    async fn remove(&self, key: &SegmentKey) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.remove_entry(key))
    }

    async fn contains(&self, key: &SegmentKey) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.entries.contains_key(&key.to_storage_key()))
    }

    fn size_bytes(&self) -> u64 {
        self.size_bytes.load(Ordering::Relaxed)
    }

    fn entry_count(&self) -> u64 {
        self.entry_count.load(Ordering::Relaxed)
    }

    fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes.load(Ordering::Relaxed)
    }

    async fn set_capacity(&self, capacity_bytes: u64) -> Result<u64> {
        self.ensure_open()?;
        self.capacity_bytes.store(capacity_bytes, Ordering::Relaxed);
        let (evicted, _) = self.evict_for(0, capacity_bytes);
        Ok(evicted)
    }

    async fn keys(&self) -> Vec<SegmentKey> {
        self.lru.keys()
    }

    async fn stale_keys(&self, max_idle: Duration) -> Vec<SegmentKey> {
        self.lru.stale(max_idle)
    }

    async fn clear(&self) -> Result<()> {
        self.ensure_open()?;
        self.entries.clear();
        self.lru.clear();
        self.size_bytes.store(0, Ordering::Relaxed);
        self.entry_count.store(0, Ordering::Relaxed);
        Ok(())
    }

    async fn compact(&self) -> Result<()> {
        self.ensure_open()?;
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.entries.clear();
        self.lru.clear();
        self.size_bytes.store(0, Ordering::Relaxed);
        self.entry_count.store(0, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(uri: &str, index: u32, len: usize) -> (SegmentKey, Bytes) {
        (SegmentKey::new(uri, index), Bytes::from(vec![0xCD; len]))
    }

    #[tokio::test]
    async fn test_basic_operations() {
        let store = MemoryStore::with_capacity(1024);

        let (key, data) = segment("video://a", 0, 100);
        store.put(key.clone(), data.clone()).await.unwrap();

        assert_eq!(store.size_bytes(), 100);
        assert_eq!(store.entry_count(), 1);
        assert_eq!(store.get(&key).await.unwrap().unwrap(), data);
        assert!(store.contains(&key).await.unwrap());

        assert_eq!(store.remove(&key).await.unwrap(), 100);
        assert_eq!(store.remove(&key).await.unwrap(), 0);
        assert_eq!(store.size_bytes(), 0);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let store = MemoryStore::with_capacity(250);

        for i in 0..2 {
            let (key, data) = segment("video://a", i, 100);
            store.put(key, data).await.unwrap();
        }
        store.get(&SegmentKey::new("video://a", 0)).await.unwrap();

        let (key, data) = segment("video://a", 2, 100);
        let receipt = store.put(key, data).await.unwrap();
        assert_eq!(receipt.evicted_entries, 1);

        assert!(store
            .contains(&SegmentKey::new("video://a", 0))
            .await
            .unwrap());
        assert!(!store
            .contains(&SegmentKey::new("video://a", 1))
            .await
            .unwrap());
        assert!(store.size_bytes() <= 250);
    }

    #[tokio::test]
    async fn test_release_blocks_mutation() {
        let store = MemoryStore::with_capacity(1024);
        store.release().await.unwrap();
        store.release().await.unwrap();

        let (key, data) = segment("video://a", 0, 10);
        assert!(matches!(
            store.put(key, data).await,
            Err(Error::StoreClosed)
        ));
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryStore::with_capacity(1024);
        for i in 0..3 {
            let (key, data) = segment("video://a", i, 50);
            store.put(key, data).await.unwrap();
        }

        store.clear().await.unwrap();
        assert_eq!(store.entry_count(), 0);
        assert_eq!(store.size_bytes(), 0);
    }
}
