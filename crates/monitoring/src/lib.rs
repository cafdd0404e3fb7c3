//! Operational monitoring.
//!
//! [`Monitor::tick`] samples process, OS and database counters into a
//! [`SystemMetrics`] record, compares it against static [`Thresholds`] and
//! hands any resulting [`Alert`]s to the configured [`AlertChannel`]s.

use thiserror::Error;

pub mod alerts;
pub mod channels;
pub mod metrics;
pub mod monitor;
pub mod stats;

pub use alerts::{Alert, Severity, Thresholds};
pub use channels::{build_channels, AlertChannel, EmailChannel, LogChannel, SmsChannel, WebhookChannel};
pub use metrics::{MetricsCollector, SystemMetrics};
pub use monitor::{HealthReport, Monitor, MAX_RECENT_ALERTS};
pub use stats::{RequestSnapshot, RequestStats};

#[derive(Debug, Error)]
pub enum MonitoringError {
    #[error("{0} alert channel is not implemented")]
    ChannelNotImplemented(&'static str),
    #[error("alert delivery failed: {0}")]
    Delivery(#[from] reqwest::Error),
    #[error("webhook returned {0}")]
    WebhookStatus(u16),
}
