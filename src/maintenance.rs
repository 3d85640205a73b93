//! Maintenance Runner
//!
//! Reclaims entries with no activity beyond a configurable age and runs a
//! structural compaction pass. Maintenance is not transactional: entries
//! removed before a fault stay removed.

use crate::metrics::CacheMetrics;
use crate::store::SegmentStoreRef;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of one maintenance pass
///
/// A pass that faults mid-way still reports the progress made before the
/// fault; `fault` carries the error message in that case.
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    /// Entries reclaimed
    pub reclaimed: u64,
    /// Bytes freed
    pub bytes_freed: u64,
    /// Error message if the pass faulted after partial progress
    pub fault: Option<String>,
}

/// Reclaims stale entries and compacts store structure
pub struct MaintenanceRunner {
    store: SegmentStoreRef,
    metrics: Arc<CacheMetrics>,
    /// Idle age beyond which an entry is reclaimed
    max_entry_age: Duration,
}

impl MaintenanceRunner {
    /// Create a runner over a store and its metrics
    pub fn new(store: SegmentStoreRef, metrics: Arc<CacheMetrics>, max_entry_age: Duration) -> Self {
        Self {
            store,
            metrics,
            max_entry_age,
        }
    }

    /// Idle age beyond which entries are reclaimed
    pub fn max_entry_age(&self) -> Duration {
        self.max_entry_age
    }

    /// Run one maintenance pass
    ///
    /// Always stamps the maintenance timestamp and counter on the way out,
    /// regardless of how many entries were reclaimed or whether the pass
    /// faulted.
    pub async fn run(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        let stale = self.store.stale_keys(self.max_entry_age).await;
        debug!(candidates = stale.len(), "Maintenance scan");

        for key in &stale {
            match self.store.remove(key).await {
                Ok(freed) => {
                    if freed > 0 {
                        report.reclaimed += 1;
                        report.bytes_freed += freed;
                        self.metrics.record_evictions(1, freed);
                    }
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Maintenance removal failed");
                    report.fault = Some(e.to_string());
                    break;
                }
            }
        }

        if report.fault.is_none() {
            if let Err(e) = self.store.compact().await {
                warn!(error = %e, "Compaction failed");
                report.fault = Some(e.to_string());
            }
        }

        self.metrics.record_maintenance();

        info!(
            reclaimed = report.reclaimed,
            bytes = report.bytes_freed,
            faulted = report.fault.is_some(),
            "Maintenance pass finished"
        );

        report
    }
}
