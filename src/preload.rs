//! Preload Scheduler Types
//!
//! Task records for preloading the opening portion of a content item, the
//! fixed segment partitioning policy, and the pluggable segment-fetch
//! collaborator. Task execution is coordinated by the engine; one task is
//! tracked per URI and a new request cancels the prior task's token.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Segmenting Policy
// =============================================================================

/// Fixed preload segment size: 1 MiB
pub const SEGMENT_SIZE: u64 = 1024 * 1024;

/// Number of segments covering `preload_amount` bytes (ceiling division)
pub fn segment_count(preload_amount: u64) -> u32 {
    preload_amount.div_ceil(SEGMENT_SIZE) as u32
}

// =============================================================================
// Preload Task
// =============================================================================

/// Status of a preload task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreloadStatus {
    /// Task is actively fetching segments
    InProgress,
    /// Task finished (possibly with a partial count when the store filled)
    Completed,
    /// Task hit a fetch or store fault
    Failed,
    /// Task was superseded by a newer request for the same URI
    Cancelled,
}

impl PreloadStatus {
    /// Whether the task has left the in-progress state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PreloadStatus::InProgress)
    }
}

/// Per-URI preload task record
#[derive(Debug, Clone)]
pub struct PreloadTask {
    /// Unique task id; a superseded loop must not touch its replacement
    pub id: u64,
    /// Target content identifier
    pub uri: String,
    /// Bytes requested for preload
    pub target_amount: u64,
    /// When the task was created
    pub start_time: DateTime<Utc>,
    /// Current status
    pub status: PreloadStatus,
    /// Bytes fetched and stored so far
    pub completed_amount: u64,
    /// Cancelled when a newer request supersedes this task
    pub cancel: CancellationToken,
}

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

impl PreloadTask {
    /// Create a fresh in-progress task
    pub fn new(uri: impl Into<String>, target_amount: u64) -> Self {
        Self {
            id: NEXT_TASK_ID.fetch_add(1, AtomicOrdering::Relaxed),
            uri: uri.into(),
            target_amount,
            start_time: Utc::now(),
            status: PreloadStatus::InProgress,
            completed_amount: 0,
            cancel: CancellationToken::new(),
        }
    }
}

// =============================================================================
// Segment Fetcher (Port)
// =============================================================================

/// Byte-range fetch capability for a content source
///
/// Injected into the engine so tests can supply deterministic timing
/// instead of real network pacing.
#[async_trait]
pub trait SegmentFetcher: Send + Sync {
    /// Fetch `len` bytes of `uri` starting at `offset`
    async fn fetch(&self, uri: &str, offset: u64, len: u64) -> Result<Bytes>;
}

/// Deterministic fetcher producing patterned bytes with optional pacing
///
/// Stands in for the network transport in the daemon binary and in tests.
#[derive(Debug, Clone, Default)]
pub struct SimulatedFetcher {
    /// Fixed delay applied per fetched segment
    pub pacing: Duration,
}

impl SimulatedFetcher {
    /// Create a fetcher with no pacing delay
    pub fn instant() -> Self {
        Self {
            pacing: Duration::ZERO,
        }
    }

    /// Create a fetcher pacing each segment by `delay`
    pub fn with_pacing(delay: Duration) -> Self {
        Self { pacing: delay }
    }
}

#[async_trait]
impl SegmentFetcher for SimulatedFetcher {
    async fn fetch(&self, _uri: &str, offset: u64, len: u64) -> Result<Bytes> {
        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
        // Pattern derived from the offset so segments are distinguishable
        let fill = (offset / SEGMENT_SIZE) as u8;
        Ok(Bytes::from(vec![fill; len as usize]))
    }
}

/// Fetcher that always fails; used to exercise the failure path in tests
#[derive(Debug, Clone, Default)]
pub struct FailingFetcher;

#[async_trait]
impl SegmentFetcher for FailingFetcher {
    async fn fetch(&self, uri: &str, _offset: u64, _len: u64) -> Result<Bytes> {
        Err(Error::Preload {
            uri: uri.to_string(),
            reason: "simulated fetch failure".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_count() {
        assert_eq!(segment_count(0), 0);
        assert_eq!(segment_count(1), 1);
        assert_eq!(segment_count(SEGMENT_SIZE), 1);
        assert_eq!(segment_count(SEGMENT_SIZE + 1), 2);
        assert_eq!(segment_count(10 * SEGMENT_SIZE), 10);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!PreloadStatus::InProgress.is_terminal());
        assert!(PreloadStatus::Completed.is_terminal());
        assert!(PreloadStatus::Failed.is_terminal());
        assert!(PreloadStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_task_creation() {
        let task = PreloadTask::new("video://a", 10 * SEGMENT_SIZE);
        assert_eq!(task.status, PreloadStatus::InProgress);
        assert_eq!(task.completed_amount, 0);
        assert!(!task.cancel.is_cancelled());

        let other = PreloadTask::new("video://b", SEGMENT_SIZE);
        assert_ne!(task.id, other.id);
    }

    #[tokio::test]
    async fn test_simulated_fetcher_length_and_pattern() {
        let fetcher = SimulatedFetcher::instant();

        let first = fetcher.fetch("video://a", 0, SEGMENT_SIZE).await.unwrap();
        assert_eq!(first.len(), SEGMENT_SIZE as usize);
        assert_eq!(first[0], 0);

        let third = fetcher
            .fetch("video://a", 2 * SEGMENT_SIZE, 100)
            .await
            .unwrap();
        assert_eq!(third.len(), 100);
        assert_eq!(third[0], 2);
    }

    #[tokio::test]
    async fn test_failing_fetcher() {
        let fetcher = FailingFetcher;
        assert!(fetcher.fetch("video://a", 0, SEGMENT_SIZE).await.is_err());
    }
}
