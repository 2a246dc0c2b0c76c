//! Metrics collection
//!
//! Every event goes to the `metrics` facade (a no-op until the host installs a
//! recorder) and to in-process atomic counters readable through
//! [`SyncMetrics::snapshot`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, histogram};

use crate::store::MergeOutcome;

/// Fetch counter name
pub const FETCH_TOTAL: &str = "conversation_sync_fetch_total";
/// Fetch latency histogram name
pub const FETCH_DURATION: &str = "conversation_sync_fetch_duration_seconds";
/// Merge counter name
pub const MERGE_TOTAL: &str = "conversation_sync_merge_total";
/// Send counter name
pub const SEND_TOTAL: &str = "conversation_sync_send_total";
/// Scanned entity counter name
pub const SCAN_ENTITIES_TOTAL: &str = "conversation_sync_scan_entities_total";

/// Whether a fetch was user-facing or a timer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Initial load or manual refresh
    Foreground,
    /// Timer tick
    Background,
}

impl FetchKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Foreground => "foreground",
            Self::Background => "background",
        }
    }
}

fn status(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}

/// Point-in-time copy of the in-process counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Completed fetches, any kind
    pub fetches: u64,
    /// Fetches that returned an error
    pub fetch_errors: u64,
    /// Merges that replaced the store
    pub merges_replaced: u64,
    /// Merges that left the store untouched
    pub merges_unchanged: u64,
    /// Fetch results dropped because the session had closed
    pub discarded: u64,
    /// Background ticks skipped because a fetch was in flight
    pub skipped_ticks: u64,
    /// Sends attempted
    pub sends: u64,
    /// Sends that failed
    pub send_errors: u64,
    /// Entities produced by scans
    pub entities: u64,
}

/// Sync engine metrics
#[derive(Debug, Default)]
pub struct SyncMetrics {
    fetches: AtomicU64,
    fetch_errors: AtomicU64,
    merges_replaced: AtomicU64,
    merges_unchanged: AtomicU64,
    discarded: AtomicU64,
    skipped_ticks: AtomicU64,
    sends: AtomicU64,
    send_errors: AtomicU64,
    entities: AtomicU64,
}

impl SyncMetrics {
    /// Fresh collector with zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed fetch
    pub fn record_fetch(&self, kind: FetchKind, duration: Duration, success: bool) {
        let labels = [("kind", kind.as_str()), ("status", status(success))];
        counter!(FETCH_TOTAL, &labels).increment(1);
        histogram!(FETCH_DURATION, &labels).record(duration.as_secs_f64());

        self.fetches.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.fetch_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a merge result
    pub fn record_merge(&self, outcome: MergeOutcome) {
        let label = if outcome.changed() { "replaced" } else { "unchanged" };
        counter!(MERGE_TOTAL, "outcome" => label).increment(1);

        let slot = if outcome.changed() {
            &self.merges_replaced
        } else {
            &self.merges_unchanged
        };
        slot.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fetch result that arrived after close
    pub fn record_discarded(&self) {
        counter!(MERGE_TOTAL, "outcome" => "discarded").increment(1);
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a background tick skipped by the in-flight guard
    pub fn record_skipped_tick(&self) {
        self.skipped_ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a send attempt
    pub fn record_send(&self, success: bool) {
        counter!(SEND_TOTAL, "status" => status(success)).increment(1);
        self.sends.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.send_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record entities found by a scan
    pub fn record_entities(&self, count: usize) {
        let count = count as u64;
        counter!(SCAN_ENTITIES_TOTAL).increment(count);
        self.entities.fetch_add(count, Ordering::Relaxed);
    }

    /// Copy the current counter values
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fetches: self.fetches.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
            merges_replaced: self.merges_replaced.load(Ordering::Relaxed),
            merges_unchanged: self.merges_unchanged.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            skipped_ticks: self.skipped_ticks.load(Ordering::Relaxed),
            sends: self.sends.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            entities: self.entities.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_starts_at_zero() {
        let metrics = SyncMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_merge_outcomes_counted_separately() {
        let metrics = SyncMetrics::new();
        metrics.record_merge(MergeOutcome::Replaced);
        metrics.record_merge(MergeOutcome::Unchanged);
        metrics.record_merge(MergeOutcome::Unchanged);
        let snap = metrics.snapshot();
        assert_eq!(snap.merges_replaced, 1);
        assert_eq!(snap.merges_unchanged, 2);
    }
}
