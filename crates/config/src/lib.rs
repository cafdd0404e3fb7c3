use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "pharmacy.toml",
    "config/pharmacy.toml",
    "crates/config/pharmacy.toml",
    "../pharmacy.toml",
    "../config/pharmacy.toml",
    "../../pharmacy.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub integrations: IntegrationsConfig,
    pub monitoring: MonitoringConfig,
    pub sharding: ShardingConfig,
    pub backup: BackupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`.
    /// Only enable behind a reverse proxy that overwrites these headers.
    pub trust_proxy_headers: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
            trust_proxy_headers: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://pharmacy.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Admin authentication settings.
///
/// There is exactly one admin identity. Without `admin_email` and
/// `admin_password_hash` every login attempt is refused.
///
/// ```
/// use pharmacy_config::AuthConfig;
///
/// let auth = AuthConfig::default();
/// assert_eq!(auth.max_login_attempts, 5);
/// assert_eq!(auth.login_window_seconds, 900);
/// assert!(auth.admin_password_hash.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_email: Option<String>,
    pub admin_password_hash: Option<String>,
    pub jwt_secret: Option<String>,
    pub jwt_issuer: String,
    pub token_ttl_seconds: u64,
    pub max_login_attempts: u32,
    pub login_window_seconds: u64,
    pub csrf_ttl_seconds: u64,
    pub cleanup_interval_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_email: None,
            admin_password_hash: None,
            jwt_secret: None,
            jwt_issuer: "pharmacy-admin".to_string(),
            token_ttl_seconds: 8 * 60 * 60,
            max_login_attempts: 5,
            login_window_seconds: 15 * 60,
            csrf_ttl_seconds: 60 * 60,
            cleanup_interval_seconds: 60 * 60,
        }
    }
}

impl AuthConfig {
    pub fn admin_configured(&self) -> bool {
        self.admin_email.is_some() && self.admin_password_hash.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    pub request_timeout_seconds: u64,
    pub woocommerce: WooCommerceConfig,
    pub wordpress: WordPressConfig,
    pub stripe: StripeConfig,
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 15,
            woocommerce: WooCommerceConfig::default(),
            wordpress: WordPressConfig::default(),
            stripe: StripeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WooCommerceConfig {
    pub base_url: Option<String>,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WordPressConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub base_url: String,
    pub currency: String,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            base_url: "https://api.stripe.com".to_string(),
            currency: "usd".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertChannelKind {
    Log,
    Webhook,
    Email,
    Sms,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub interval_seconds: u64,
    pub thresholds: ThresholdConfig,
    pub alert_channels: Vec<AlertChannelKind>,
    pub webhook_url: Option<String>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            thresholds: ThresholdConfig::default(),
            alert_channels: vec![AlertChannelKind::Log],
            webhook_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub cpu_load_percent: f64,
    pub memory_percent: f64,
    pub error_rate_percent: f64,
    pub response_time_ms: f64,
    pub db_latency_ms: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu_load_percent: 80.0,
            memory_percent: 85.0,
            error_rate_percent: 5.0,
            response_time_ms: 1_000.0,
            db_latency_ms: 250.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardStrategy {
    #[default]
    RoundRobin,
    Hash,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardingConfig {
    pub strategy: ShardStrategy,
    /// Additional shard URLs. When empty the primary database is the only shard.
    pub shards: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub directory: String,
    pub retention: usize,
    /// Zero disables scheduled backups.
    pub interval_seconds: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            directory: "backups".to_string(),
            retention: 7,
            interval_seconds: 0,
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use pharmacy_config::load;
///
/// std::env::remove_var("PHARMACY_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder();
    builder = builder
        .set_default("http.address", defaults.http.address.clone())
        .context("unable to build configuration")?
        .set_default("http.port", i64::from(defaults.http.port))
        .context("unable to build configuration")?
        .set_default("database.url", defaults.database.url.clone())
        .context("unable to build configuration")?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )
        .context("unable to build configuration")?;

    let environment_overrides = config::Environment::with_prefix("PHARMACY").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("PHARMACY_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via PHARMACY_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.auth.token_ttl_seconds > i64::MAX as u64 {
        config.auth.token_ttl_seconds = i64::MAX as u64;
    }

    if config.auth.admin_email.as_deref().is_some_and(str::is_empty) {
        config.auth.admin_email = None;
    }

    debug!(
        http = ?config.http,
        database = %config.database.url,
        admin_configured = config.auth.admin_configured(),
        "loaded backend configuration"
    );
    Ok(config)
}
