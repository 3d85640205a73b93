//! Cache Metrics
//!
//! Atomic per-field counters updated on every store operation, plus a
//! bounded rolling history of usage samples. Interleaved increments from
//! preload and monitor ticks never lose updates but may be observed in any
//! relative order.

use crate::config::CacheStrategy;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// Cache Metrics
// =============================================================================

/// Mutable cache counters
///
/// Writes and deletes are independent counters, not a balance; consumers
/// must not assume `total_bytes_written - total_bytes_deleted` models live
/// storage usage.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Number of read requests
    pub read_requests: AtomicU64,
    /// Number of write requests
    pub write_requests: AtomicU64,
    /// Number of cache hits
    pub cache_hits: AtomicU64,
    /// Number of entries evicted
    pub evictions: AtomicU64,
    /// Total bytes ever written
    pub total_bytes_written: AtomicU64,
    /// Total bytes ever deleted
    pub total_bytes_deleted: AtomicU64,
    /// Last maintenance timestamp (Unix millis, 0 = never)
    pub last_maintenance_ms: AtomicU64,
    /// Number of completed maintenance passes
    pub maintenance_count: AtomicU64,
}

impl CacheMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read request that hit the cache
    #[inline]
    pub fn record_hit(&self) {
        self.read_requests.fetch_add(1, Ordering::Relaxed);
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a read request that missed
    #[inline]
    pub fn record_miss(&self) {
        self.read_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a write of `bytes`
    #[inline]
    pub fn record_write(&self, bytes: u64) {
        self.write_requests.fetch_add(1, Ordering::Relaxed);
        self.total_bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record `entries` evictions freeing `bytes`
    #[inline]
    pub fn record_evictions(&self, entries: u64, bytes: u64) {
        if entries > 0 {
            self.evictions.fetch_add(entries, Ordering::Relaxed);
        }
        if bytes > 0 {
            self.total_bytes_deleted.fetch_add(bytes, Ordering::Relaxed);
        }
    }

    /// Record one explicit deletion of `bytes`
    #[inline]
    pub fn record_deletion(&self, bytes: u64) {
        self.total_bytes_deleted.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Stamp a completed maintenance pass
    pub fn record_maintenance(&self) {
        self.last_maintenance_ms
            .store(Utc::now().timestamp_millis() as u64, Ordering::Release);
        self.maintenance_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Milliseconds since the last maintenance pass (u64::MAX if never)
    pub fn millis_since_maintenance(&self) -> u64 {
        let last = self.last_maintenance_ms.load(Ordering::Acquire);
        if last == 0 {
            return u64::MAX;
        }
        (Utc::now().timestamp_millis() as u64).saturating_sub(last)
    }

    /// Hit ratio in [0,1]: hits over total requests (0 when idle)
    pub fn hit_ratio(&self) -> f64 {
        let requests = self.read_requests.load(Ordering::Relaxed)
            + self.write_requests.load(Ordering::Relaxed);
        if requests == 0 {
            0.0
        } else {
            self.cache_hits.load(Ordering::Relaxed) as f64 / requests as f64
        }
    }

    /// Reset every counter to zero
    ///
    /// Only `clear_cache` calls this.
    pub fn reset(&self) {
        self.read_requests.store(0, Ordering::Relaxed);
        self.write_requests.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.total_bytes_written.store(0, Ordering::Relaxed);
        self.total_bytes_deleted.store(0, Ordering::Relaxed);
        self.last_maintenance_ms.store(0, Ordering::Relaxed);
        self.maintenance_count.store(0, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            read_requests: self.read_requests.load(Ordering::Relaxed),
            write_requests: self.write_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            total_bytes_written: self.total_bytes_written.load(Ordering::Relaxed),
            total_bytes_deleted: self.total_bytes_deleted.load(Ordering::Relaxed),
            last_maintenance_ms: self.last_maintenance_ms.load(Ordering::Relaxed),
            maintenance_count: self.maintenance_count.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Metrics Snapshot
// =============================================================================

/// Point-in-time snapshot of cache metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub read_requests: u64,
    pub write_requests: u64,
    pub cache_hits: u64,
    pub evictions: u64,
    pub total_bytes_written: u64,
    pub total_bytes_deleted: u64,
    pub last_maintenance_ms: u64,
    pub maintenance_count: u64,
}

impl MetricsSnapshot {
    /// Hit ratio in [0,1]
    pub fn hit_ratio(&self) -> f64 {
        let requests = self.read_requests + self.write_requests;
        if requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / requests as f64
        }
    }
}

// =============================================================================
// Usage History
// =============================================================================

/// Immutable historical usage sample appended per monitor tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheUsageEntry {
    /// Sample time
    pub timestamp: DateTime<Utc>,
    /// Store size at sample time
    pub size_bytes: u64,
    /// Usage percentage against the configured capacity
    pub usage_percent: f64,
    /// Strategy in effect at sample time
    pub strategy: CacheStrategy,
}

/// Bounded FIFO history of usage samples
///
/// Oldest entries are dropped first once capacity is reached, independent
/// of the store's own LRU eviction.
#[derive(Debug)]
pub struct UsageHistory {
    entries: Mutex<VecDeque<CacheUsageEntry>>,
    capacity: usize,
}

impl UsageHistory {
    /// Create a history bounded to `capacity` samples
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a sample, dropping the oldest beyond capacity
    pub fn push(&self, entry: CacheUsageEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copy of the retained samples, oldest first
    pub fn samples(&self) -> Vec<CacheUsageEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Drop all samples
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
