//! On-Disk Segment Store
//!
//! File-based persistent store for media segments. Each segment lives in a
//! hash-sharded subdirectory as a data file plus a `.meta` JSON sidecar;
//! the index is rebuilt by scanning on open. Writes that would exceed the
//! configured capacity evict least-recently-used entries first.

use crate::error::{Error, Result};
use crate::store::lru::{LruTracker, TrackedEntry};
use crate::store::{PutReceipt, SegmentKey, SegmentStore};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

// =============================================================================
// Sidecar Metadata
// =============================================================================

/// Metadata stored alongside each segment file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMetadata {
    uri: String,
    index: u32,
    size_bytes: u64,
    created_at: i64,
    last_accessed_ms: i64,
    access_count: u64,
}

// =============================================================================
// Disk Store
// =============================================================================

/// Persistent segment store with internal LRU eviction
pub struct DiskStore {
    /// Root directory for segment files
    root: PathBuf,
    /// Index of stored segments (storage key -> data file path)
    index: RwLock<HashMap<String, PathBuf>>,
    /// Recency tracker driving eviction and staleness
    lru: LruTracker,
    /// Current total size in bytes
    size_bytes: AtomicU64,
    /// Current entry count
    entry_count: AtomicU64,
    /// Capacity bound; writes evict down to this
    capacity_bytes: AtomicU64,
    /// Set once `release` has run
    closed: AtomicBool,
}

impl DiskStore {
    /// Open (or create) a store rooted at `root` with the given capacity
    ///
    /// Fails with `Error::StoreInit` if the directory cannot be created or
    /// the existing index cannot be rebuilt.
    pub async fn open(root: impl Into<PathBuf>, capacity_bytes: u64) -> Result<Self> {
        let root = root.into();

        fs::create_dir_all(&root)
            .await
            .map_err(|e| Error::StoreInit(format!("cannot create {}: {}", root.display(), e)))?;

        let store = Self {
            root,
            index: RwLock::new(HashMap::new()),
            lru: LruTracker::new(),
            size_bytes: AtomicU64::new(0),
            entry_count: AtomicU64::new(0),
            capacity_bytes: AtomicU64::new(capacity_bytes),
            closed: AtomicBool::new(false),
        };

        store
            .rebuild_index()
            .await
            .map_err(|e| Error::StoreInit(format!("index rebuild failed: {}", e)))?;

        Ok(store)
    }

    /// Rebuild index and recency tracking from disk
    async fn rebuild_index(&self) -> Result<()> {
        let mut rebuilt: Vec<(String, PathBuf, StoredMetadata)> = Vec::new();

        let mut root_entries = fs::read_dir(&self.root).await?;
        while let Some(root_entry) = root_entries.next_entry().await? {
            let shard_path = root_entry.path();
            if !shard_path.is_dir() {
                continue;
            }

            let mut shard_entries = match fs::read_dir(&shard_path).await {
                Ok(e) => e,
                Err(_) => continue,
            };

            while let Some(entry) = shard_entries.next_entry().await? {
                let path = entry.path();
                if !path.extension().map(|e| e == "meta").unwrap_or(false) {
                    continue;
                }

                let metadata_json = match fs::read_to_string(&path).await {
                    Ok(json) => json,
                    Err(_) => continue,
                };
                let metadata: StoredMetadata = match serde_json::from_str(&metadata_json) {
                    Ok(m) => m,
                    Err(_) => continue,
                };

                let data_path = path.with_extension("");
                if data_path.exists() {
                    let key = SegmentKey::new(metadata.uri.clone(), metadata.index);
                    rebuilt.push((key.to_storage_key(), data_path, metadata));
                }
            }
        }

        // Oldest access first so the tracker's recency order survives restart
        rebuilt.sort_by_key(|(_, _, m)| m.last_accessed_ms);

        let mut total_size = 0u64;
        let mut count = 0u64;
        {
            let mut index = self.index.write();
            index.clear();
            self.lru.clear();

            for (storage_key, data_path, metadata) in rebuilt {
                let key = SegmentKey::new(metadata.uri, metadata.index);
                total_size += metadata.size_bytes;
                count += 1;
                self.lru.track(TrackedEntry {
                    key,
                    size_bytes: metadata.size_bytes,
                    last_accessed_ms: metadata.last_accessed_ms.max(0) as u64,
                    access_count: metadata.access_count,
                });
                index.insert(storage_key, data_path);
            }
        }

        self.size_bytes.store(total_size, Ordering::Relaxed);
        self.entry_count.store(count, Ordering::Relaxed);

        debug!(entries = count, bytes = total_size, "Rebuilt store index");
        Ok(())
    }

    /// File path for a key (hash-based shard subdirectory)
    fn file_path(&self, key: &SegmentKey) -> PathBuf {
        let shard_dir = self.root.join(format!("{:02x}", key.shard_index()));
        shard_dir.join(Self::safe_filename(&key.to_storage_key()))
    }

    /// Hash a storage key into a filesystem-safe name
    fn safe_filename(key: &str) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::StoreClosed)
        } else {
            Ok(())
        }
    }

    /// Evict LRU entries until `needed` additional bytes fit under `capacity`
    async fn evict_for(&self, needed: u64, capacity: u64) -> Result<(u64, u64)> {
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
                let freed = self.remove_entry(&candidate.key).await?;
                if freed > 0 {
                    evicted_entries += 1;
                    evicted_bytes += freed;
                }
            }
        }

        Ok((evicted_entries, evicted_bytes))
    }

    /// Remove one entry's files and bookkeeping; returns bytes freed
    async fn remove_entry(&self, key: &SegmentKey) -> Result<u64> {
        let storage_key = key.to_storage_key();

        let data_path = {
            let mut index = self.index.write();
            index.remove(&storage_key)
        };

        let data_path = match data_path {
            Some(p) => p,
            None => {
                self.lru.remove(key);
                return Ok(0);
            }
        };

        let freed = self.lru.remove(key).map(|e| e.size_bytes).unwrap_or(0);

        let _ = fs::remove_file(&data_path).await;
        let _ = fs::remove_file(data_path.with_extension("meta")).await;

        self.entry_count.fetch_sub(1, Ordering::Relaxed);
        self.size_bytes.fetch_sub(freed, Ordering::Relaxed);

        Ok(freed)
    }

    /// Persist updated access metadata for a key (fire and forget)
    fn touch_sidecar(&self, meta_path: PathBuf, mut metadata: StoredMetadata) {
        metadata.last_accessed_ms = Utc::now().timestamp_millis();
        metadata.access_count += 1;
        tokio::spawn(async move {
            if let Ok(json) = serde_json::to_string(&metadata) {
                let _ = fs::write(&meta_path, json).await;
            }
        });
    }
}

#[async_trait]
impl SegmentStore for DiskStore {
    async fn get(&self, key: &SegmentKey) -> Result<Option<Bytes>> {
        self.ensure_open()?;
        let storage_key = key.to_storage_key();

        let data_path = {
            let index = self.index.read();
            match index.get(&storage_key) {
                Some(path) => path.clone(),
                None => return Ok(None),
            }
        };

        let data = match fs::read(&data_path).await {
            Ok(bytes) => bytes,
            Err(_) => return Ok(None),
        };

        self.lru.access(key);

        let meta_path = data_path.with_extension("meta");
        if let Ok(json) = fs::read_to_string(&meta_path).await {
            if let Ok(metadata) = serde_json::from_str::<StoredMetadata>(&json) {
                self.touch_sidecar(meta_path, metadata);
            }
        }

        Ok(Some(Bytes::from(data)))
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

        // Replacing an entry frees its old bytes first
        let replaced = self.remove_entry(&key).await?;

        let (evicted_entries, evicted_bytes) = self.evict_for(new_size, capacity).await?;

        let data_path = self.file_path(&key);
        if let Some(parent) = data_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&data_path).await?;
        file.write_all(&data).await?;

        let now = Utc::now();
        let metadata = StoredMetadata {
            uri: key.uri.clone(),
            index: key.index,
            size_bytes: new_size,
            created_at: now.timestamp(),
            last_accessed_ms: now.timestamp_millis(),
            access_count: 1,
        };
        fs::write(
            data_path.with_extension("meta"),
            serde_json::to_string(&metadata)?,
        )
        .await?;

        {
            let mut index = self.index.write();
            index.insert(key.to_storage_key(), data_path);
        }
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
        self.remove_entry(key).await
    }

    async fn contains(&self, key: &SegmentKey) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.index.read().contains_key(&key.to_storage_key()))
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
        let (evicted, _) = self.evict_for(0, capacity_bytes).await?;
        if evicted > 0 {
            debug!(evicted, capacity_bytes, "Shrunk store to new capacity");
        }
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

        let paths: Vec<PathBuf> = {
            let mut index = self.index.write();
            let paths = index.values().cloned().collect();
            index.clear();
            paths
        };
        self.lru.clear();

        for data_path in paths {
            let _ = fs::remove_file(&data_path).await;
            let _ = fs::remove_file(data_path.with_extension("meta")).await;
        }

        self.size_bytes.store(0, Ordering::Relaxed);
        self.entry_count.store(0, Ordering::Relaxed);

        Ok(())
    }

    async fn compact(&self) -> Result<()> {
        self.ensure_open()?;

        // Drop files the index no longer references, then empty shard dirs
        let live: std::collections::HashSet<PathBuf> =
            self.index.read().values().cloned().collect();

        let mut root_entries = fs::read_dir(&self.root).await?;
        while let Some(root_entry) = root_entries.next_entry().await? {
            let shard_path = root_entry.path();
            if !shard_path.is_dir() {
                continue;
            }

            let mut shard_entries = match fs::read_dir(&shard_path).await {
                Ok(e) => e,
                Err(_) => continue,
            };

            let mut remaining = 0usize;
            while let Some(entry) = shard_entries.next_entry().await? {
                let path = entry.path();
                let data_path = if path.extension().map(|e| e == "meta").unwrap_or(false) {
                    path.with_extension("")
                } else {
                    path.clone()
                };

                if live.contains(&data_path) {
                    remaining += 1;
                } else {
                    let _ = fs::remove_file(&path).await;
                }
            }

            if remaining == 0 {
                if let Err(e) = fs::remove_dir(&shard_path).await {
                    warn!(shard = %shard_path.display(), error = %e, "Could not remove empty shard dir");
                }
            }
        }

        Ok(())
    }

    async fn release(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.index.write().clear();
        self.lru.clear();
        self.size_bytes.store(0, Ordering::Relaxed);
        self.entry_count.store(0, Ordering::Relaxed);
        debug!(root = %self.root.display(), "Released disk store");
        Ok(())
    }
}
