//! Authgate - account registration and session token service

use anyhow::Result;
use authgate_api::{AppState, create_router};
use authgate_auth::{CredentialHasher, SessionAuthority, TokenConfig};
use authgate_db::Database;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod tasks;

use config::Config;
use tasks::spawn_revocation_purge_task;

/// Authgate - account registration and session token service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "AUTHGATE_CONFIG", default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "AUTHGATE_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "AUTHGATE_PORT")]
    port: Option<u16>,

    /// Token signing secret
    #[arg(long, env = "AUTHGATE_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;
    if let Some(secret) = args.jwt_secret {
        config.auth.jwt_secret = secret;
    }

    // Initialize logging
    init_logging(&config.logging.level, &config.logging.format);

    info!("Starting Authgate v{}", env!("CARGO_PKG_VERSION"));
    if config.auth.uses_default_secret() {
        warn!("Using the default JWT secret; set AUTHGATE_JWT_SECRET in production");
    }

    // Initialize database
    if let Some(parent) = Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let db = Database::new(&format!("sqlite:{}", config.database.path)).await?;

    // Initialize session authority
    let hasher = CredentialHasher::new(config.auth.hash_cost())?;
    let token_config = TokenConfig::new(
        config.auth.jwt_secret.clone(),
        chrono::Duration::minutes(config.auth.token_ttl_minutes),
    );
    let store = Arc::new(db.clone());
    let authority = Arc::new(SessionAuthority::new(
        &token_config,
        hasher,
        store.clone(),
        store,
    ));

    // Install the Prometheus recorder before any counter is touched
    let metrics_handle = if config.metrics.enabled {
        Some(Arc::new(PrometheusBuilder::new().install_recorder()?))
    } else {
        None
    };

    let purge_interval = config.auth.revocation_purge_interval_minutes;
    let purge_task = (purge_interval > 0).then(|| spawn_revocation_purge_task(db, purge_interval));

    // Create router
    let app = create_router(AppState::new(authority), metrics_handle)
        .layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = purge_task {
        task.abort();
    }

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}
