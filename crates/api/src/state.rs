use std::sync::Arc;

use pharmacy_auth::AdminAuthenticator;
use pharmacy_database::{
    AppointmentRepository, BackupManager, CustomerRepository, InteractionRepository,
    NotificationRepository, OrderRepository, PrescriptionRepository, ProductRepository,
    ShardManager,
};
use pharmacy_integrations::Integrations;
use pharmacy_monitoring::Monitor;
use sqlx::SqlitePool;

const DEFAULT_CURRENCY: &str = "usd";

#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    authenticator: AdminAuthenticator,
    integrations: Integrations,
    shards: Arc<ShardManager>,
    backups: BackupManager,
    monitor: Monitor,
    currency: String,
    trust_proxy_headers: bool,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        authenticator: AdminAuthenticator,
        shards: Arc<ShardManager>,
        backups: BackupManager,
        monitor: Monitor,
    ) -> Self {
        Self {
            pool,
            authenticator,
            integrations: Integrations::default(),
            shards,
            backups,
            monitor,
            currency: DEFAULT_CURRENCY.to_string(),
            trust_proxy_headers: false,
        }
    }

    pub fn with_integrations(mut self, integrations: Integrations) -> Self {
        self.integrations = integrations;
        self
    }

    /// Currency used for orders and payment intents.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into().to_ascii_lowercase();
        self
    }

    /// Read client addresses from proxy headers instead of the socket.
    pub fn with_trusted_proxy_headers(mut self, trusted: bool) -> Self {
        self.trust_proxy_headers = trusted;
        self
    }

    pub fn trusts_proxy_headers(&self) -> bool {
        self.trust_proxy_headers
    }

    pub fn db_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn authenticator(&self) -> &AdminAuthenticator {
        &self.authenticator
    }

    pub fn integrations(&self) -> &Integrations {
        &self.integrations
    }

    pub fn shards(&self) -> &ShardManager {
        &self.shards
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn interactions(&self) -> InteractionRepository {
        InteractionRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    pub fn prescriptions(&self) -> PrescriptionRepository {
        PrescriptionRepository::new(self.pool.clone())
    }

    pub fn appointments(&self) -> AppointmentRepository {
        AppointmentRepository::new(self.pool.clone())
    }

    pub fn notifications(&self) -> NotificationRepository {
        NotificationRepository::new(self.pool.clone())
    }
}
