//! Request counters fed by the HTTP layer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct RequestStats {
    requests: AtomicU64,
    server_errors: AtomicU64,
    total_micros: AtomicU64,
}

/// Counters accumulated since the previous snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RequestSnapshot {
    pub requests: u64,
    pub server_errors: u64,
    pub error_rate_percent: f64,
    pub avg_response_time_ms: f64,
}

impl RequestStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one finished request. Only 5xx responses are errors.
    pub fn record(&self, status: u16, duration: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if status >= 500 {
            self.server_errors.fetch_add(1, Ordering::Relaxed);
        }
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn snapshot_and_reset(&self) -> RequestSnapshot {
        let requests = self.requests.swap(0, Ordering::Relaxed);
        let server_errors = self.server_errors.swap(0, Ordering::Relaxed);
        let total_micros = self.total_micros.swap(0, Ordering::Relaxed);

        if requests == 0 {
            return RequestSnapshot::default();
        }

        RequestSnapshot {
            requests,
            server_errors,
            error_rate_percent: server_errors as f64 * 100.0 / requests as f64,
            avg_response_time_ms: total_micros as f64 / requests as f64 / 1_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_computes_rates_and_resets() {
        let stats = RequestStats::new();
        stats.record(200, Duration::from_millis(10));
        stats.record(404, Duration::from_millis(20));
        stats.record(500, Duration::from_millis(30));
        stats.record(503, Duration::from_millis(40));

        let snapshot = stats.snapshot_and_reset();
        assert_eq!(snapshot.requests, 4);
        assert_eq!(snapshot.server_errors, 2);
        assert!((snapshot.error_rate_percent - 50.0).abs() < f64::EPSILON);
        assert!((snapshot.avg_response_time_ms - 25.0).abs() < 1e-9);

        assert_eq!(stats.snapshot_and_reset(), RequestSnapshot::default());
    }
}
