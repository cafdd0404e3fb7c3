use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use pharmacy_auth::AdminAuthenticator;
use pharmacy_config::{AppConfig, DatabaseConfig};
use pharmacy_database::{initialize_database, BackupManager, ShardManager};
use pharmacy_integrations::{build_http_client, Integrations};
use pharmacy_monitoring::{Monitor, RequestStats};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub mod telemetry {
    use anyhow::Result;
    use tracing_subscriber::{fmt, EnvFilter};

    /// Install the global fmt subscriber. `RUST_LOG` overrides the `info` default.
    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(env_filter)
            .try_init()
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub authenticator: AdminAuthenticator,
    pub integrations: Integrations,
    pub shards: Arc<ShardManager>,
    pub backups: BackupManager,
    pub monitor: Monitor,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise primary database")?;

        let authenticator = AdminAuthenticator::new(db_pool.clone(), &config.auth);
        if !authenticator.is_configured() {
            warn!("admin credentials are not configured, admin login is disabled");
        }

        let integrations = Integrations::from_config(&config.integrations)
            .context("failed to build integration clients")?;

        let shards = Arc::new(connect_shards(config, db_pool.clone()).await?);

        let backups = BackupManager::new(&config.backup.directory, config.backup.retention);

        let alert_http = build_http_client(Duration::from_secs(
            config.integrations.request_timeout_seconds.max(1),
        ))
        .context("failed to build alert http client")?;
        let monitor = Monitor::from_config(&config.monitoring, Arc::new(RequestStats::new()), alert_http);

        info!(
            shards = shards.len(),
            backup_directory = %backups.directory().display(),
            admin_configured = authenticator.is_configured(),
            "backend services ready"
        );

        Ok(Self {
            db_pool,
            authenticator,
            integrations,
            shards,
            backups,
            monitor,
        })
    }
}

/// The primary pool is always shard 0. Extra shard URLs get their own
/// pools with the primary's connection limit and the same schema.
async fn connect_shards(config: &AppConfig, primary: SqlitePool) -> Result<ShardManager> {
    let mut pools = vec![(config.database.url.clone(), primary)];

    for url in &config.sharding.shards {
        let shard_config = DatabaseConfig {
            url: url.clone(),
            max_connections: config.database.max_connections,
        };
        let pool = initialize_database(&shard_config)
            .await
            .with_context(|| format!("failed to initialise shard {url}"))?;
        pools.push((url.clone(), pool));
    }

    ShardManager::from_pools(pools, config.sharding.strategy).context("failed to build shard manager")
}

/// Handles to the periodic maintenance tasks. Dropping aborts them.
pub struct BackgroundJobs {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundJobs {
    pub fn names(&self) -> Vec<&'static str> {
        self.handles.iter().map(|(name, _)| *name).collect()
    }

    pub fn shutdown(mut self) {
        self.abort_all();
    }

    fn abort_all(&mut self) {
        for (name, handle) in self.handles.drain(..) {
            debug!(job = name, "stopping background job");
            handle.abort();
        }
    }
}

impl Drop for BackgroundJobs {
    fn drop(&mut self) {
        self.abort_all();
    }
}

/// Start auth cleanup, monitoring ticks and, when `backup.interval_seconds`
/// is non-zero, scheduled backups. A zero interval disables that job.
pub fn spawn_background_jobs(services: &BackendServices, config: &AppConfig) -> BackgroundJobs {
    let mut handles = Vec::new();

    if config.auth.cleanup_interval_seconds > 0 {
        let authenticator = services.authenticator.clone();
        handles.push((
            "auth-cleanup",
            spawn_every(config.auth.cleanup_interval_seconds, move || {
                let authenticator = authenticator.clone();
                async move {
                    if let Err(error) = authenticator.cleanup_expired().await {
                        warn!(%error, "auth cleanup failed");
                    }
                }
            }),
        ));
    }

    if config.monitoring.interval_seconds > 0 {
        let monitor = services.monitor.clone();
        let pool = services.db_pool.clone();
        handles.push((
            "monitoring",
            spawn_every(config.monitoring.interval_seconds, move || {
                let monitor = monitor.clone();
                let pool = pool.clone();
                async move {
                    monitor.tick(&pool).await;
                }
            }),
        ));
    }

    if config.backup.interval_seconds > 0 {
        let backups = services.backups.clone();
        let pool = services.db_pool.clone();
        handles.push((
            "backup",
            spawn_every(config.backup.interval_seconds, move || {
                let backups = backups.clone();
                let pool = pool.clone();
                async move {
                    match backups.create_backup(&pool).await {
                        Ok(record) => info!(file = %record.file_name, "scheduled backup written"),
                        Err(error) => warn!(%error, "scheduled backup failed"),
                    }
                }
            }),
        ));
    }

    info!(jobs = handles.len(), "background jobs started");
    BackgroundJobs { handles }
}

fn spawn_every<F, Fut>(seconds: u64, mut job: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let period = Duration::from_secs(seconds);
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            job().await;
        }
    })
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(?error, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(?error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
