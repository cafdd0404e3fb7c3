//! Loader behaviour across defaults, file discovery, environment overrides
//! and validation.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use pharmacy_config::{
    load, AlertChannelKind, AppConfig, AuthConfig, BackupConfig, HttpConfig, ShardStrategy,
    StripeConfig,
};

const ENV_VARS_TO_RESET: &[&str] = &[
    "PHARMACY_CONFIG",
    "PHARMACY__AUTH__ADMIN_EMAIL",
    "PHARMACY__AUTH__ADMIN_PASSWORD_HASH",
    "PHARMACY__AUTH__JWT_SECRET",
    "PHARMACY__AUTH__TOKEN_TTL_SECONDS",
    "PHARMACY__AUTH__MAX_LOGIN_ATTEMPTS",
    "PHARMACY__DATABASE__MAX_CONNECTIONS",
    "PHARMACY__DATABASE__URL",
    "PHARMACY__HTTP__ADDRESS",
    "PHARMACY__HTTP__PORT",
    "PHARMACY__INTEGRATIONS__STRIPE__SECRET_KEY",
    "PHARMACY__SHARDING__STRATEGY",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

fn isolated() -> (TempDir, TestContext) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());
    (temp_dir, ctx)
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let (_temp_dir, _ctx) = isolated();

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert!(!config.http.trust_proxy_headers);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(config.database.max_connections, defaults.database.max_connections);
    assert_eq!(config.auth.token_ttl_seconds, defaults.auth.token_ttl_seconds);
    assert!(!config.auth.admin_configured());
    assert_eq!(config.sharding.strategy, ShardStrategy::RoundRobin);
    assert!(config.sharding.shards.is_empty());
    assert_eq!(config.monitoring.alert_channels, vec![AlertChannelKind::Log]);
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(temp_dir.path(), "pharmacy.toml", "[http]\nport = 4242\n");
    write_config_file(temp_dir.path(), "config/pharmacy.toml", "[http]\nport = 5151\n");

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "pharmacy.toml",
        r#"
        [http]
        port = 8181

        [database]
        max_connections = 50

        [auth]
        max_login_attempts = 3
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.http.port, 8181);
    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.database.max_connections, 50);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(config.auth.max_login_attempts, 3);
    assert_eq!(config.auth.login_window_seconds, defaults.auth.login_window_seconds);
    assert_eq!(config.integrations.stripe.base_url, defaults.integrations.stripe.base_url);
}

#[test]
#[serial]
fn load_reads_sharding_and_monitoring_sections() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "pharmacy.toml",
        r#"
        [sharding]
        strategy = "hash"
        shards = ["sqlite://shard-a.db", "sqlite://shard-b.db"]

        [monitoring]
        interval_seconds = 15
        alert_channels = ["log", "webhook"]
        webhook_url = "https://hooks.example.com/pharmacy"

        [monitoring.thresholds]
        memory_percent = 70.0
        "#,
    );

    let config = load().expect("configuration load should succeed");
    assert_eq!(config.sharding.strategy, ShardStrategy::Hash);
    assert_eq!(config.sharding.shards.len(), 2);
    assert_eq!(config.monitoring.interval_seconds, 15);
    assert_eq!(
        config.monitoring.alert_channels,
        vec![AlertChannelKind::Log, AlertChannelKind::Webhook]
    );
    assert_eq!(config.monitoring.thresholds.memory_percent, 70.0);
    assert_eq!(config.monitoring.thresholds.cpu_load_percent, 80.0);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(temp_dir.path(), "pharmacy.toml", "[http]\nport = 3030\n");
    ctx.set_var("PHARMACY__HTTP__PORT", "9090");
    ctx.set_var("PHARMACY__HTTP__TRUST_PROXY_HEADERS", "true");
    ctx.set_var("PHARMACY__AUTH__ADMIN_EMAIL", "admin@pharmacy.test");
    ctx.set_var("PHARMACY__AUTH__ADMIN_PASSWORD_HASH", "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 9090);
    assert!(config.http.trust_proxy_headers);
    assert_eq!(config.auth.admin_email.as_deref(), Some("admin@pharmacy.test"));
    assert!(config.auth.admin_configured());
}

#[test]
#[serial]
fn load_honours_explicit_config_path() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(temp_dir.path(), "pharmacy.toml", "[http]\nport = 1111\n");
    write_config_file(temp_dir.path(), "elsewhere/custom.toml", "[http]\nport = 2222\n");
    let explicit = temp_dir.path().join("elsewhere/custom.toml");
    ctx.set_var("PHARMACY_CONFIG", explicit.display().to_string());

    let config = load().expect("configuration load should use PHARMACY_CONFIG");
    assert_eq!(config.http.port, 2222);
}

#[test]
#[serial]
fn load_clamps_token_ttl_to_i64_maximum() {
    let (_temp_dir, mut ctx) = isolated();

    let oversized = (i64::MAX as u128 + 42).to_string();
    ctx.set_var("PHARMACY__AUTH__TOKEN_TTL_SECONDS", &oversized);

    let config = load().expect("configuration load should succeed with oversized TTL");
    assert_eq!(config.auth.token_ttl_seconds, i64::MAX as u64);
}

#[test]
#[serial]
fn load_treats_empty_admin_email_as_unset() {
    let (_temp_dir, mut ctx) = isolated();

    ctx.set_var("PHARMACY__AUTH__ADMIN_EMAIL", "");

    let config = load().expect("configuration load should succeed");
    assert!(config.auth.admin_email.is_none());
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "pharmacy.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn auth_config_requires_both_email_and_hash() {
    let mut auth = AuthConfig::default();
    assert!(!auth.admin_configured());

    auth.admin_email = Some("admin@pharmacy.test".into());
    assert!(!auth.admin_configured());

    auth.admin_password_hash = Some("hash".into());
    assert!(auth.admin_configured());
}

#[test]
fn http_config_defaults_match_expected_host_and_port() {
    let defaults = HttpConfig::default();
    assert_eq!(defaults.address, "127.0.0.1");
    assert_eq!(defaults.port, 8080);
}

#[test]
fn stripe_and_backup_defaults() {
    let stripe = StripeConfig::default();
    assert_eq!(stripe.base_url, "https://api.stripe.com");
    assert_eq!(stripe.currency, "usd");
    assert!(stripe.secret_key.is_none());

    let backup = BackupConfig::default();
    assert_eq!(backup.retention, 7);
    assert_eq!(backup.interval_seconds, 0);
}
