use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pharmacy_api::{build_router, AppState};
use pharmacy_config::load as load_config;
use pharmacy_runtime::{shutdown_signal, spawn_background_jobs, telemetry, BackendServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "pharmacy-backend")]
#[command(about = "Pharmacy storefront and admin backend (serves by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Start the HTTP server and background jobs
    Serve,
    /// Print an argon2 hash for `auth.admin_password_hash`
    HashPassword {
        /// Plain-text admin password
        password: String,
    },
    /// Write one database backup and prune old ones
    Backup,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::HashPassword { password } => hash_password(&password),
        Commands::Backup => run_backup().await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting pharmacy backend");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;
    let jobs = spawn_background_jobs(&services, &config);

    let state = AppState::new(
        services.db_pool.clone(),
        services.authenticator.clone(),
        services.shards.clone(),
        services.backups.clone(),
        services.monitor.clone(),
    )
    .with_integrations(services.integrations.clone())
    .with_currency(config.integrations.stripe.currency.clone())
    .with_trusted_proxy_headers(config.http.trust_proxy_headers);
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, jobs = ?jobs.names(), "http server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;

    jobs.shutdown();
    services.shards.close().await;
    info!("backend shut down");
    Ok(())
}

fn hash_password(password: &str) -> anyhow::Result<()> {
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    let hash = pharmacy_auth::hash_password(password).context("failed to hash password")?;
    println!("{hash}");
    Ok(())
}

async fn run_backup() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;
    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let record = services
        .backups
        .create_backup(&services.db_pool)
        .await
        .context("backup failed")?;

    println!(
        "{} ({} bytes) in {}",
        record.file_name,
        record.size_bytes,
        services.backups.directory().display()
    );
    services.shards.close().await;
    Ok(())
}
