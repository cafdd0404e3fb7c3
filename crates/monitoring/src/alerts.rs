use serde::Serialize;
use utoipa::ToSchema;

use pharmacy_config::ThresholdConfig;

use crate::metrics::SystemMetrics;

/// Values above `threshold * CRITICAL_FACTOR` escalate to critical.
const CRITICAL_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Alert {
    pub metric: String,
    pub severity: Severity,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    pub triggered_at: String,
}

#[derive(Debug, Clone)]
pub struct Thresholds {
    config: ThresholdConfig,
}

impl Thresholds {
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    /// Compare a sample against the configured limits.
    ///
    /// Metrics that could not be sampled are skipped, except the database:
    /// an unanswered probe always raises a critical `database` alert.
    pub fn evaluate(&self, metrics: &SystemMetrics) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let at = &metrics.timestamp;

        let checks = [
            ("cpu_load_percent", metrics.cpu_load_percent, self.config.cpu_load_percent, "%"),
            ("memory_percent", metrics.memory_percent, self.config.memory_percent, "%"),
            (
                "error_rate_percent",
                (metrics.request_count > 0).then_some(metrics.error_rate_percent),
                self.config.error_rate_percent,
                "%",
            ),
            (
                "avg_response_time_ms",
                (metrics.request_count > 0).then_some(metrics.avg_response_time_ms),
                self.config.response_time_ms,
                "ms",
            ),
            ("db_latency_ms", metrics.db_latency_ms, self.config.db_latency_ms, "ms"),
        ];

        for (metric, value, threshold, unit) in checks {
            let Some(value) = value else { continue };
            if let Some(severity) = classify(value, threshold) {
                alerts.push(Alert {
                    metric: metric.to_string(),
                    severity,
                    value,
                    threshold,
                    message: format!(
                        "{metric} at {value:.1}{unit} exceeds {threshold:.1}{unit}"
                    ),
                    triggered_at: at.clone(),
                });
            }
        }

        if metrics.db_latency_ms.is_none() {
            alerts.push(Alert {
                metric: "database".to_string(),
                severity: Severity::Critical,
                value: 0.0,
                threshold: 0.0,
                message: "database did not respond to the health probe".to_string(),
                triggered_at: at.clone(),
            });
        }

        alerts
    }
}

fn classify(value: f64, threshold: f64) -> Option<Severity> {
    if value > threshold * CRITICAL_FACTOR {
        Some(Severity::Critical)
    } else if value > threshold {
        Some(Severity::Warning)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SystemMetrics {
        SystemMetrics {
            timestamp: "2025-01-01T00:00:00.000Z".into(),
            uptime_seconds: 10,
            cpu_load_percent: Some(10.0),
            memory_percent: Some(40.0),
            db_latency_ms: Some(1.0),
            db_connections: 1,
            db_idle_connections: 1,
            request_count: 10,
            error_rate_percent: 0.0,
            avg_response_time_ms: 20.0,
        }
    }

    #[test]
    fn quiet_sample_raises_nothing() {
        let thresholds = Thresholds::new(ThresholdConfig::default());
        assert!(thresholds.evaluate(&sample()).is_empty());
    }

    #[test]
    fn escalates_to_critical_above_one_and_a_half_times() {
        let thresholds = Thresholds::new(ThresholdConfig::default());
        let mut metrics = sample();
        metrics.memory_percent = Some(90.0);
        metrics.cpu_load_percent = Some(130.0);

        let alerts = thresholds.evaluate(&metrics);
        assert_eq!(alerts.len(), 2);

        let cpu = alerts.iter().find(|a| a.metric == "cpu_load_percent").unwrap();
        assert_eq!(cpu.severity, Severity::Critical);
        let memory = alerts.iter().find(|a| a.metric == "memory_percent").unwrap();
        assert_eq!(memory.severity, Severity::Warning);
        assert_eq!(memory.threshold, 85.0);
        assert_eq!(memory.triggered_at, metrics.timestamp);
    }

    #[test]
    fn exactly_at_threshold_is_not_an_alert() {
        let thresholds = Thresholds::new(ThresholdConfig::default());
        let mut metrics = sample();
        metrics.error_rate_percent = 5.0;
        assert!(thresholds.evaluate(&metrics).is_empty());
    }

    #[test]
    fn request_metrics_are_ignored_without_traffic() {
        let thresholds = Thresholds::new(ThresholdConfig::default());
        let mut metrics = sample();
        metrics.request_count = 0;
        metrics.error_rate_percent = 100.0;
        metrics.avg_response_time_ms = 10_000.0;
        assert!(thresholds.evaluate(&metrics).is_empty());
    }

    #[test]
    fn unreachable_database_is_critical() {
        let thresholds = Thresholds::new(ThresholdConfig::default());
        let mut metrics = sample();
        metrics.db_latency_ms = None;
        metrics.cpu_load_percent = None;

        let alerts = thresholds.evaluate(&metrics);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].metric, "database");
        assert_eq!(alerts[0].severity, Severity::Critical);
    }
}
