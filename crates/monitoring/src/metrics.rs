use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::fs;
use tracing::warn;
use utoipa::ToSchema;

use pharmacy_database::now_timestamp;

use crate::stats::RequestStats;

/// One sample of process, host and database health.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SystemMetrics {
    pub timestamp: String,
    pub uptime_seconds: u64,
    /// One-minute load average relative to the available cores.
    pub cpu_load_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    /// `None` when the database did not answer.
    pub db_latency_ms: Option<f64>,
    pub db_connections: u32,
    pub db_idle_connections: usize,
    pub request_count: u64,
    pub error_rate_percent: f64,
    pub avg_response_time_ms: f64,
}

#[derive(Debug, Clone)]
pub struct MetricsCollector {
    started_at: Instant,
    requests: Arc<RequestStats>,
}

impl MetricsCollector {
    pub fn new(requests: Arc<RequestStats>) -> Self {
        Self {
            started_at: Instant::now(),
            requests,
        }
    }

    pub fn requests(&self) -> &Arc<RequestStats> {
        &self.requests
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Sample everything. Request counters are reset by each call.
    pub async fn collect(&self, pool: &SqlitePool) -> SystemMetrics {
        let db_latency_ms = database_latency_ms(pool).await;
        let requests = self.requests.snapshot_and_reset();

        SystemMetrics {
            timestamp: now_timestamp(),
            uptime_seconds: self.uptime_seconds(),
            cpu_load_percent: cpu_load_percent().await,
            memory_percent: memory_percent().await,
            db_latency_ms,
            db_connections: pool.size(),
            db_idle_connections: pool.num_idle(),
            request_count: requests.requests,
            error_rate_percent: requests.error_rate_percent,
            avg_response_time_ms: requests.avg_response_time_ms,
        }
    }
}

pub(crate) async fn database_latency_ms(pool: &SqlitePool) -> Option<f64> {
    let started = Instant::now();
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => Some(started.elapsed().as_secs_f64() * 1_000.0),
        Err(error) => {
            warn!(?error, "database latency probe failed");
            None
        }
    }
}

async fn cpu_load_percent() -> Option<f64> {
    let contents = fs::read_to_string("/proc/loadavg").await.ok()?;
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    parse_loadavg(&contents, cores)
}

async fn memory_percent() -> Option<f64> {
    let contents = fs::read_to_string("/proc/meminfo").await.ok()?;
    parse_meminfo(&contents)
}

fn parse_loadavg(contents: &str, cores: usize) -> Option<f64> {
    let one_minute: f64 = contents.split_whitespace().next()?.parse().ok()?;
    Some(one_minute / cores.max(1) as f64 * 100.0)
}

fn parse_meminfo(contents: &str) -> Option<f64> {
    let mut total = None;
    let mut available = None;

    for line in contents.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("MemTotal:") => total = parts.next().and_then(|v| v.parse::<f64>().ok()),
            Some("MemAvailable:") => available = parts.next().and_then(|v| v.parse::<f64>().ok()),
            _ => {}
        }
    }

    let total = total.filter(|t| *t > 0.0)?;
    let available = available?;
    Some((total - available) / total * 100.0)
}
