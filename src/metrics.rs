use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-stage metrics collector
#[derive(Debug, Clone)]
pub struct StageMetrics {
    /// Number of items read from the input queue
    received: Arc<AtomicU64>,
    /// Number of items sent to the output queue
    forwarded: Arc<AtomicU64>,
    /// Number of items rejected by a predicate
    rejected: Arc<AtomicU64>,
    /// Number of items overwritten in a full ring buffer
    evicted: Arc<AtomicU64>,
    /// Number of non-empty buffer flushes
    flushes: Arc<AtomicU64>,
    /// Creation time for throughput calculation
    start_time: Instant,
}

impl StageMetrics {
    /// Create a new metrics collector for a stage
    pub fn new() -> Self {
        Self {
            received: Arc::new(AtomicU64::new(0)),
            forwarded: Arc::new(AtomicU64::new(0)),
            rejected: Arc::new(AtomicU64::new(0)),
            evicted: Arc::new(AtomicU64::new(0)),
            flushes: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn total_forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn total_rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn total_evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    pub fn total_flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Calculate forwarding throughput in items per second
    pub fn throughput_ips(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            0.0
        } else {
            self.total_forwarded() as f64 / elapsed
        }
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_received: self.total_received(),
            total_forwarded: self.total_forwarded(),
            total_rejected: self.total_rejected(),
            total_evicted: self.total_evicted(),
            total_flushes: self.total_flushes(),
            throughput_ips: self.throughput_ips(),
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for StageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub total_received: u64,
    pub total_forwarded: u64,
    pub total_rejected: u64,
    pub total_evicted: u64,
    pub total_flushes: u64,
    pub throughput_ips: f64,
    pub elapsed: Duration,
}

impl MetricsSnapshot {
    /// Format metrics as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "Received: {}, Forwarded: {}, Rejected: {}, Evicted: {}, Flushes: {}, \
             Throughput: {:.2} items/s, Elapsed: {:.2}s",
            self.total_received,
            self.total_forwarded,
            self.total_rejected,
            self.total_evicted,
            self.total_flushes,
            self.throughput_ips,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_metrics() {
        let metrics = StageMetrics::new();
        for _ in 0..10 {
            metrics.record_received();
        }
        for _ in 0..4 {
            metrics.record_forwarded();
        }
        metrics.record_rejected();
        metrics.record_evicted();
        metrics.record_flush();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_received, 10);
        assert_eq!(snapshot.total_forwarded, 4);
        assert_eq!(snapshot.total_rejected, 1);
        assert_eq!(snapshot.total_evicted, 1);
        assert_eq!(snapshot.total_flushes, 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = StageMetrics::new();
        let clone = metrics.clone();
        clone.record_forwarded();
        assert_eq!(metrics.total_forwarded(), 1);
        assert!(metrics.snapshot().format().contains("Forwarded: 1"));
    }
}
