//! Content Store
//!
//! Durable key-addressed segment storage with internal capacity-bounded LRU
//! eviction. The engine configures and queries eviction; it never
//! re-implements the policy itself.

mod disk;
mod memory;
pub mod lru;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Segment Key
// =============================================================================

/// Unique identifier for one cached media segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentKey {
    /// Content identifier (e.g., "video://episode-42")
    pub uri: String,
    /// Zero-based segment index within the content item
    pub index: u32,
}

impl SegmentKey {
    /// Create a new segment key
    pub fn new(uri: impl Into<String>, index: u32) -> Self {
        Self {
            uri: uri.into(),
            index,
        }
    }

    /// Get a string representation for storage
    pub fn to_storage_key(&self) -> String {
        format!("{}#{:08}", self.uri, self.index)
    }

    /// Parse from storage key string
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let (uri, index_str) = key.rsplit_once('#')?;
        let index = index_str.parse().ok()?;
        Some(Self {
            uri: uri.to_string(),
            index,
        })
    }

    /// Get the shard index for this key (64-way sharding)
    #[inline]
    pub fn shard_index(&self) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash(&mut hasher);
        (hasher.finish() as usize) % 64
    }
}

impl Hash for SegmentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
        self.index.hash(state);
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_storage_key())
    }
}

// =============================================================================
// Put Receipt
// =============================================================================

/// Outcome of a store write
///
/// Eviction happens inside the store; the receipt lets callers account
/// evicted entries without observing the policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PutReceipt {
    /// Bytes written for the new entry
    pub written_bytes: u64,
    /// Entries evicted to make room
    pub evicted_entries: u64,
    /// Bytes freed by eviction
    pub evicted_bytes: u64,
}

// =============================================================================
// SegmentStore Trait (Port)
// =============================================================================

/// Trait for segment storage backends
///
/// Implementations evict least-recently-used entries internally once a
/// write would exceed `capacity_bytes`. Introspection methods
/// (`size_bytes`, `entry_count`, `keys`, `stale_keys`) must not fail on a
/// healthy store; on internal fault they return zero/empty rather than
/// propagating, since they feed monitoring.
#[async_trait]
pub trait SegmentStore: Send + Sync {
    /// Get a segment's bytes, refreshing its recency on hit
    async fn get(&self, key: &SegmentKey) -> Result<Option<Bytes>>;

    /// Store a segment, evicting LRU entries first if needed
    async fn put(&self, key: SegmentKey, data: Bytes) -> Result<PutReceipt>;

    /// Remove one segment
    ///
    /// Idempotent: removing a non-existent key returns 0 bytes freed.
    async fn remove(&self, key: &SegmentKey) -> Result<u64>;

    /// Check if a segment exists
    async fn contains(&self, key: &SegmentKey) -> Result<bool>;

    /// Current total size in bytes (0 on internal fault)
    fn size_bytes(&self) -> u64;

    /// Current entry count (0 on internal fault)
    fn entry_count(&self) -> u64;

    /// Configured capacity in bytes
    fn capacity_bytes(&self) -> u64;

    /// Re-size the store, evicting LRU entries down to the new bound
    ///
    /// Returns the number of entries evicted.
    async fn set_capacity(&self, capacity_bytes: u64) -> Result<u64>;

    /// All keys currently stored (empty on internal fault)
    async fn keys(&self) -> Vec<SegmentKey>;

    /// Keys whose last access is older than `max_idle` (empty on fault)
    async fn stale_keys(&self, max_idle: Duration) -> Vec<SegmentKey>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;

    /// Structural compaction pass
    async fn compact(&self) -> Result<()>;

    /// Close all underlying handles
    ///
    /// Safe to call multiple times; mutating operations after release
    /// fail with `Error::StoreClosed`.
    async fn release(&self) -> Result<()>;
}

/// Type alias for a shared store handle
pub type SegmentStoreRef = Arc<dyn SegmentStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_key_roundtrip() {
        let key = SegmentKey::new("video://episode-42", 7);
        assert_eq!(key.to_storage_key(), "video://episode-42#00000007");

        let parsed = SegmentKey::from_storage_key("video://episode-42#00000007").unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_segment_key_uri_with_hash() {
        // rsplit keeps URIs containing '#' intact
        let key = SegmentKey::new("video://a#fragment", 3);
        let parsed = SegmentKey::from_storage_key(&key.to_storage_key()).unwrap();
        assert_eq!(parsed.uri, "video://a#fragment");
        assert_eq!(parsed.index, 3);
    }

    #[test]
    fn test_segment_key_parse_failures() {
        assert!(SegmentKey::from_storage_key("no-separator").is_none());
        assert!(SegmentKey::from_storage_key("uri#notanumber").is_none());
    }

    #[test]
    fn test_segment_key_sharding() {
        let key1 = SegmentKey::new("video://a", 0);
        let key2 = SegmentKey::new("video://a", 0);
        assert_eq!(key1.shard_index(), key2.shard_index());
        assert!(key1.shard_index() < 64);
    }
}
