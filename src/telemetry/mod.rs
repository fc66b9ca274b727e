//! Logging setup and upstream call metrics.

use crate::config::TelemetryConfig;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_logging(config: &TelemetryConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::config_key(format!("Invalid log level: {}", e), "telemetry.log_level"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let installed = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| Error::internal(format!("Failed to set logging subscriber: {}", e)))
}

/// Counters for calls made to the LiteLLM proxy.
#[derive(Debug, Default)]
pub struct UpstreamMetrics {
    calls: AtomicU64,
    failures: AtomicU64,
    total_latency_us: AtomicU64,
}

impl UpstreamMetrics {
    /// Create an empty set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished call.
    pub fn record_call(&self, elapsed: Duration, success: bool) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// Point-in-time view of the counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let calls = self.calls.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);
        let total_us = self.total_latency_us.load(Ordering::Relaxed);

        let avg_latency_ms = if calls > 0 {
            (total_us as f64 / calls as f64) / 1000.0
        } else {
            0.0
        };
        let failure_rate = if calls > 0 {
            (failures as f64 / calls as f64) * 100.0
        } else {
            0.0
        };

        MetricsSnapshot {
            upstream_calls: calls,
            upstream_failures: failures,
            failure_rate,
            avg_latency_ms,
        }
    }
}

/// Metrics reported by `system.metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Calls issued to the proxy
    pub upstream_calls: u64,
    /// Calls that failed (transport, status or decode)
    pub upstream_failures: u64,
    /// Failure percentage
    pub failure_rate: f64,
    /// Mean call latency in milliseconds
    pub avg_latency_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let metrics = UpstreamMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.upstream_calls, 0);
        assert_eq!(snapshot.failure_rate, 0.0);
        assert_eq!(snapshot.avg_latency_ms, 0.0);
    }

    #[test]
    fn test_record_calls() {
        let metrics = UpstreamMetrics::new();
        metrics.record_call(Duration::from_millis(4), true);
        metrics.record_call(Duration::from_millis(2), false);
        metrics.record_call(Duration::from_millis(6), true);
        metrics.record_call(Duration::from_millis(8), true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.upstream_calls, 4);
        assert_eq!(snapshot.upstream_failures, 1);
        assert!((snapshot.failure_rate - 25.0).abs() < f64::EPSILON);
        assert!((snapshot.avg_latency_ms - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let config = TelemetryConfig {
            log_level: "liteclient=verbose".to_string(),
            ..TelemetryConfig::default()
        };
        // RUST_LOG may be set in CI; only assert when it is not.
        if std::env::var("RUST_LOG").is_err() {
            assert!(init_logging(&config).is_err());
        }
    }
}
