//! Alert delivery targets.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use pharmacy_config::{AlertChannelKind, MonitoringConfig};

use crate::alerts::{Alert, Severity};
use crate::MonitoringError;

#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, alert: &Alert) -> Result<(), MonitoringError>;
}

/// Writes alerts to the tracing output.
#[derive(Debug, Default)]
pub struct LogChannel;

#[async_trait]
impl AlertChannel for LogChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, alert: &Alert) -> Result<(), MonitoringError> {
        match alert.severity {
            Severity::Critical => error!(
                metric = %alert.metric,
                value = alert.value,
                threshold = alert.threshold,
                "{}",
                alert.message
            ),
            Severity::Warning => warn!(
                metric = %alert.metric,
                value = alert.value,
                threshold = alert.threshold,
                "{}",
                alert.message
            ),
        }
        Ok(())
    }
}

/// POSTs each alert as JSON to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    http: reqwest::Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, alert: &Alert) -> Result<(), MonitoringError> {
        let response = self.http.post(&self.url).json(alert).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MonitoringError::WebhookStatus(status.as_u16()));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct EmailChannel;

#[async_trait]
impl AlertChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, _alert: &Alert) -> Result<(), MonitoringError> {
        Err(MonitoringError::ChannelNotImplemented("email"))
    }
}

#[derive(Debug, Default)]
pub struct SmsChannel;

#[async_trait]
impl AlertChannel for SmsChannel {
    fn name(&self) -> &'static str {
        "sms"
    }

    async fn send(&self, _alert: &Alert) -> Result<(), MonitoringError> {
        Err(MonitoringError::ChannelNotImplemented("sms"))
    }
}

/// Instantiate the channels listed in `config.alert_channels`.
///
/// A webhook entry without `webhook_url` is skipped with a warning.
pub fn build_channels(
    config: &MonitoringConfig,
    http: reqwest::Client,
) -> Vec<Arc<dyn AlertChannel>> {
    let mut channels: Vec<Arc<dyn AlertChannel>> = Vec::new();

    for kind in &config.alert_channels {
        match kind {
            AlertChannelKind::Log => channels.push(Arc::new(LogChannel)),
            AlertChannelKind::Webhook => match config.webhook_url.as_deref() {
                Some(url) if !url.trim().is_empty() => {
                    channels.push(Arc::new(WebhookChannel::new(http.clone(), url)))
                }
                _ => warn!("webhook alert channel configured without monitoring.webhook_url"),
            },
            AlertChannelKind::Email => channels.push(Arc::new(EmailChannel)),
            AlertChannelKind::Sms => channels.push(Arc::new(SmsChannel)),
        }
    }

    channels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert() -> Alert {
        Alert {
            metric: "memory_percent".into(),
            severity: Severity::Warning,
            value: 90.0,
            threshold: 85.0,
            message: "memory high".into(),
            triggered_at: "2025-01-01T00:00:00.000Z".into(),
        }
    }

    #[tokio::test]
    async fn stub_channels_report_not_implemented() {
        let email = EmailChannel.send(&alert()).await.unwrap_err();
        assert!(matches!(email, MonitoringError::ChannelNotImplemented("email")));
        let sms = SmsChannel.send(&alert()).await.unwrap_err();
        assert!(matches!(sms, MonitoringError::ChannelNotImplemented("sms")));
        LogChannel.send(&alert()).await.unwrap();
    }

    #[test]
    fn build_channels_skips_webhook_without_url() {
        let config = MonitoringConfig {
            alert_channels: vec![
                AlertChannelKind::Log,
                AlertChannelKind::Webhook,
                AlertChannelKind::Sms,
            ],
            webhook_url: None,
            ..MonitoringConfig::default()
        };

        let names: Vec<_> = build_channels(&config, reqwest::Client::new())
            .iter()
            .map(|c| c.name())
            .collect();
        assert_eq!(names, vec!["log", "sms"]);
    }
}
