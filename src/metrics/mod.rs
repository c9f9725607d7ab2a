//! Feed and fetch metrics
//!
//! Counts ticks and chart fetches, tracks fetch round-trip latency and
//! mirrors the counters into the `metrics` facade.

use std::time::{Duration, Instant};

use crate::feed::ConnectionStatus;

/// Point-in-time view of the collected metrics
#[derive(Debug, Clone, Default)]
pub struct FeedMetrics {
    pub status: ConnectionStatus,
    pub ticks_received: u64,
    pub ticks_applied: u64,
    pub stale_responses: u64,
    pub older_pages: u64,
    pub reconnect_count: u32,
    pub fetch_latency_p50: u64,
    pub fetch_latency_p95: u64,
    pub ticks_per_second: f64,
}

/// Metrics collector for the chart session
pub struct MetricsCollector {
    fetch_latency_samples: Vec<u64>,
    max_samples: usize,
    tick_window_count: u64,
    last_reset: Instant,
    snapshot: FeedMetrics,
    was_connected: bool,
}

impl MetricsCollector {
    /// Create a new metrics collector keeping up to `max_samples` latencies
    pub fn new(max_samples: usize) -> Self {
        Self {
            fetch_latency_samples: Vec::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            tick_window_count: 0,
            last_reset: Instant::now(),
            snapshot: FeedMetrics::default(),
            was_connected: false,
        }
    }

    /// Track a push channel status change; dropping out of Connected counts as a reconnect
    pub fn record_status(&mut self, status: ConnectionStatus) {
        if self.was_connected && status != ConnectionStatus::Connected {
            self.snapshot.reconnect_count += 1;
        }
        self.was_connected = status == ConnectionStatus::Connected;
        self.snapshot.status = status;
    }

    pub fn record_tick_received(&mut self) {
        self.snapshot.ticks_received += 1;
        self.tick_window_count += 1;
        metrics::increment_counter!("stockchart_ticks_received");
    }

    pub fn record_tick_applied(&mut self) {
        self.snapshot.ticks_applied += 1;
        metrics::increment_counter!("stockchart_ticks_applied");
    }

    /// A fetch response arrived for a selection that is no longer current
    pub fn record_stale_response(&mut self) {
        self.snapshot.stale_responses += 1;
        metrics::increment_counter!("stockchart_stale_responses");
    }

    pub fn record_older_page(&mut self) {
        self.snapshot.older_pages += 1;
        metrics::increment_counter!("stockchart_older_pages");
    }

    /// Record chart fetch round-trip time
    pub fn record_fetch_latency(&mut self, elapsed: Duration) {
        if self.fetch_latency_samples.len() >= self.max_samples {
            self.fetch_latency_samples.remove(0);
        }
        self.fetch_latency_samples.push(elapsed.as_millis() as u64);
        metrics::histogram!("stockchart_fetch_latency_ms", elapsed.as_secs_f64() * 1000.0);
    }

    /// p50/p95 of recorded fetch latencies in milliseconds
    pub fn calculate_percentiles(&self) -> (u64, u64) {
        if self.fetch_latency_samples.is_empty() {
            return (0, 0);
        }

        let mut sorted = self.fetch_latency_samples.clone();
        sorted.sort_unstable();

        let len = sorted.len();
        let p50 = sorted[(len * 50 / 100).min(len - 1)];
        let p95 = sorted[(len * 95 / 100).min(len - 1)];
        (p50, p95)
    }

    /// Ticks per second since the last reset
    pub fn ticks_per_second(&self) -> f64 {
        let elapsed = self.last_reset.elapsed();
        if elapsed.as_secs() == 0 {
            return 0.0;
        }
        self.tick_window_count as f64 / elapsed.as_secs_f64()
    }

    pub fn snapshot(&self) -> FeedMetrics {
        let (p50, p95) = self.calculate_percentiles();
        FeedMetrics {
            fetch_latency_p50: p50,
            fetch_latency_p95: p95,
            ticks_per_second: self.ticks_per_second(),
            ..self.snapshot.clone()
        }
    }

    /// Time since the rate window started
    pub fn rate_window(&self) -> Duration {
        self.last_reset.elapsed()
    }

    /// Restart the rate window
    pub fn reset_rate(&mut self) {
        self.tick_window_count = 0;
        self.last_reset = Instant::now();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_counting() {
        let mut collector = MetricsCollector::default();
        collector.record_status(ConnectionStatus::Connecting);
        collector.record_status(ConnectionStatus::Connected);
        collector.record_status(ConnectionStatus::Connecting);
        collector.record_status(ConnectionStatus::Connected);
        assert_eq!(collector.snapshot().reconnect_count, 1);
        assert_eq!(collector.snapshot().status, ConnectionStatus::Connected);
    }

    #[test]
    fn test_fetch_latency_percentiles() {
        let mut collector = MetricsCollector::new(10);
        for ms in 1..=20 {
            collector.record_fetch_latency(Duration::from_millis(ms));
        }
        // only the last 10 samples are kept
        let (p50, p95) = collector.calculate_percentiles();
        assert_eq!(p50, 16);
        assert_eq!(p95, 20);
    }

    #[test]
    fn test_counters() {
        let mut collector = MetricsCollector::default();
        collector.record_tick_received();
        collector.record_tick_received();
        collector.record_tick_applied();
        collector.record_stale_response();
        let snapshot = collector.snapshot();
        assert_eq!(snapshot.ticks_received, 2);
        assert_eq!(snapshot.ticks_applied, 1);
        assert_eq!(snapshot.stale_responses, 1);
    }
}
