//! Monitor behaviour against a real SQLite pool and a mocked webhook.

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use pharmacy_config::{AlertChannelKind, MonitoringConfig, ThresholdConfig};
use pharmacy_monitoring::{
    AlertChannel, MetricsCollector, Monitor, RequestStats, Thresholds, WebhookChannel,
    MAX_RECENT_ALERTS,
};

type TestResult<T = ()> = anyhow::Result<T>;

async fn memory_pool() -> TestResult<SqlitePool> {
    Ok(SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?)
}

/// Every request-driven metric trips with this configuration.
fn hair_trigger() -> ThresholdConfig {
    ThresholdConfig {
        cpu_load_percent: f64::MAX,
        memory_percent: f64::MAX,
        error_rate_percent: 1.0,
        response_time_ms: 1.0,
        db_latency_ms: f64::MAX,
    }
}

fn failing_traffic(stats: &RequestStats) {
    stats.record(500, Duration::from_millis(50));
}

#[tokio::test]
async fn webhook_receives_alert_json() -> TestResult {
    let server = MockServer::start_async().await;
    let hook = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/alerts")
                .header("content-type", "application/json")
                .json_body_partial(r#"{"metric":"error_rate_percent","severity":"critical"}"#);
            then.status(204);
        })
        .await;
    let other = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/alerts")
                .json_body_partial(r#"{"metric":"avg_response_time_ms"}"#);
            then.status(204);
        })
        .await;

    let stats = Arc::new(RequestStats::new());
    let channel: Arc<dyn AlertChannel> =
        Arc::new(WebhookChannel::new(reqwest::Client::new(), server.url("/alerts")));
    let monitor = Monitor::new(
        MetricsCollector::new(stats.clone()),
        Thresholds::new(hair_trigger()),
        vec![channel],
    );

    failing_traffic(&stats);
    let pool = memory_pool().await?;
    monitor.tick(&pool).await;

    hook.assert_hits_async(1).await;
    other.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn failing_channel_does_not_abort_tick() -> TestResult {
    let server = MockServer::start_async().await;
    let hook = server
        .mock_async(|when, then| {
            when.method(POST).path("/alerts");
            then.status(500).json_body(json!({"error": "down"}));
        })
        .await;

    let stats = Arc::new(RequestStats::new());
    let config = MonitoringConfig {
        thresholds: hair_trigger(),
        alert_channels: vec![
            AlertChannelKind::Webhook,
            AlertChannelKind::Email,
            AlertChannelKind::Log,
        ],
        webhook_url: Some(server.url("/alerts")),
        ..MonitoringConfig::default()
    };
    let monitor = Monitor::from_config(&config, stats.clone(), reqwest::Client::new());

    failing_traffic(&stats);
    let pool = memory_pool().await?;
    let metrics = monitor.tick(&pool).await;

    assert_eq!(metrics.request_count, 1);
    hook.assert_hits_async(2).await;
    assert_eq!(monitor.recent_alerts(10).await.len(), 2);
    assert!(monitor.latest().await.is_some());
    Ok(())
}

#[tokio::test]
async fn recent_alerts_are_bounded_and_newest_first() -> TestResult {
    let stats = Arc::new(RequestStats::new());
    let monitor = Monitor::new(
        MetricsCollector::new(stats.clone()),
        Thresholds::new(hair_trigger()),
        Vec::new(),
    );
    let pool = memory_pool().await?;

    for _ in 0..MAX_RECENT_ALERTS {
        failing_traffic(&stats);
        monitor.tick(&pool).await;
    }

    let alerts = monitor.recent_alerts(usize::MAX).await;
    assert_eq!(alerts.len(), MAX_RECENT_ALERTS);
    assert!(alerts[0].triggered_at >= alerts[alerts.len() - 1].triggered_at);
    assert_eq!(monitor.recent_alerts(3).await.len(), 3);
    Ok(())
}

#[tokio::test]
async fn health_reports_degraded_when_database_is_gone() -> TestResult {
    let monitor = Monitor::new(
        MetricsCollector::new(Arc::new(RequestStats::new())),
        Thresholds::new(ThresholdConfig::default()),
        Vec::new(),
    )
    .with_version("9.9.9");

    let pool = memory_pool().await?;
    let healthy = monitor.health(&pool).await;
    assert_eq!(healthy.status, "ok");
    assert_eq!(healthy.database, "ok");
    assert_eq!(healthy.version, "9.9.9");

    pool.close().await;
    let degraded = monitor.health(&pool).await;
    assert_eq!(degraded.status, "degraded");
    assert_eq!(degraded.database, "unreachable");

    let metrics = monitor.tick(&pool).await;
    assert!(metrics.db_latency_ms.is_none());
    let alerts = monitor.recent_alerts(10).await;
    assert!(alerts.iter().any(|a| a.metric == "database"));
    Ok(())
}
