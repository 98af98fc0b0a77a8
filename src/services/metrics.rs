//! Relay counters surfaced on `/health`

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::types::StreamOutcome;

pub struct RelayMetrics {
    sessions_issued: AtomicU64,
    streams_opened: AtomicU64,
    fragments_relayed: AtomicU64,
    streams_completed: AtomicU64,
    streams_aborted: AtomicU64,
    streams_failed: AtomicU64,
    upstream_failures: AtomicU64,
    persist_failures: AtomicU64,
    start_time: Instant,
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self {
            sessions_issued: AtomicU64::new(0),
            streams_opened: AtomicU64::new(0),
            fragments_relayed: AtomicU64::new(0),
            streams_completed: AtomicU64::new(0),
            streams_aborted: AtomicU64::new(0),
            streams_failed: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_session(&self) {
        self.sessions_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_opened(&self) {
        self.streams_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fragment(&self) {
        self.fragments_relayed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an upstream failure before the stream opened. Failures after
    /// output has started are counted by [`record_close`](Self::record_close)
    /// as `streams_failed`.
    pub fn record_upstream_failure(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_close(&self, outcome: StreamOutcome) {
        let counter = match outcome {
            StreamOutcome::Completed => &self.streams_completed,
            StreamOutcome::ClientAbort => &self.streams_aborted,
            StreamOutcome::UpstreamError => &self.streams_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_issued: self.sessions_issued.load(Ordering::Relaxed),
            streams_opened: self.streams_opened.load(Ordering::Relaxed),
            fragments_relayed: self.fragments_relayed.load(Ordering::Relaxed),
            streams_completed: self.streams_completed.load(Ordering::Relaxed),
            streams_aborted: self.streams_aborted.load(Ordering::Relaxed),
            streams_failed: self.streams_failed.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub sessions_issued: u64,
    pub streams_opened: u64,
    pub fragments_relayed: u64,
    pub streams_completed: u64,
    pub streams_aborted: u64,
    pub streams_failed: u64,
    pub upstream_failures: u64,
    pub persist_failures: u64,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_outcomes_land_in_their_counters() {
        let metrics = RelayMetrics::new();
        metrics.record_stream_opened();
        metrics.record_close(StreamOutcome::Completed);
        metrics.record_close(StreamOutcome::ClientAbort);
        metrics.record_close(StreamOutcome::UpstreamError);
        metrics.record_upstream_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.streams_opened, 1);
        assert_eq!(snapshot.streams_completed, 1);
        assert_eq!(snapshot.streams_aborted, 1);
        assert_eq!(snapshot.streams_failed, 1);
        assert_eq!(snapshot.upstream_failures, 1);
    }
}
