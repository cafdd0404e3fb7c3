use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use utoipa::ToSchema;

use pharmacy_config::MonitoringConfig;
use pharmacy_database::now_timestamp;

use crate::alerts::{Alert, Thresholds};
use crate::channels::{build_channels, AlertChannel};
use crate::metrics::{database_latency_ms, MetricsCollector, SystemMetrics};
use crate::stats::RequestStats;

pub const MAX_RECENT_ALERTS: usize = 100;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthReport {
    /// `ok` or `degraded`.
    pub status: String,
    /// `ok` or `unreachable`.
    pub database: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub timestamp: String,
}

#[derive(Default)]
struct MonitorState {
    latest: Option<SystemMetrics>,
    alerts: VecDeque<Alert>,
}

#[derive(Clone)]
pub struct Monitor {
    collector: MetricsCollector,
    thresholds: Thresholds,
    channels: Vec<Arc<dyn AlertChannel>>,
    state: Arc<RwLock<MonitorState>>,
    version: String,
}

impl Monitor {
    pub fn new(
        collector: MetricsCollector,
        thresholds: Thresholds,
        channels: Vec<Arc<dyn AlertChannel>>,
    ) -> Self {
        Self {
            collector,
            thresholds,
            channels,
            state: Arc::new(RwLock::new(MonitorState::default())),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn from_config(
        config: &MonitoringConfig,
        requests: Arc<RequestStats>,
        http: reqwest::Client,
    ) -> Self {
        Self::new(
            MetricsCollector::new(requests),
            Thresholds::new(config.thresholds.clone()),
            build_channels(config, http),
        )
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn request_stats(&self) -> Arc<RequestStats> {
        self.collector.requests().clone()
    }

    /// Collect, evaluate, remember and dispatch. Channel failures are logged.
    pub async fn tick(&self, pool: &SqlitePool) -> SystemMetrics {
        let metrics = self.collector.collect(pool).await;
        let alerts = self.thresholds.evaluate(&metrics);
        debug!(alerts = alerts.len(), "monitoring tick");

        {
            let mut state = self.state.write().await;
            state.latest = Some(metrics.clone());
            for alert in &alerts {
                if state.alerts.len() == MAX_RECENT_ALERTS {
                    state.alerts.pop_front();
                }
                state.alerts.push_back(alert.clone());
            }
        }

        for alert in &alerts {
            for channel in &self.channels {
                if let Err(error) = channel.send(alert).await {
                    warn!(channel = channel.name(), metric = %alert.metric, %error, "alert delivery failed");
                }
            }
        }

        metrics
    }

    pub async fn latest(&self) -> Option<SystemMetrics> {
        self.state.read().await.latest.clone()
    }

    /// Most recent first.
    pub async fn recent_alerts(&self, limit: usize) -> Vec<Alert> {
        let state = self.state.read().await;
        state.alerts.iter().rev().take(limit).cloned().collect()
    }

    pub async fn health(&self, pool: &SqlitePool) -> HealthReport {
        let database_ok = database_latency_ms(pool).await.is_some();
        HealthReport {
            status: if database_ok { "ok" } else { "degraded" }.to_string(),
            database: if database_ok { "ok" } else { "unreachable" }.to_string(),
            uptime_seconds: self.collector.uptime_seconds(),
            version: self.version.clone(),
            timestamp: now_timestamp(),
        }
    }
}
