//! Relay - multi-tenant event-routing gateway
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (in-memory storage, 127.0.0.1:3000)
//! relay
//!
//! # Run with a config file
//! relay run --config configs/relay.toml
//!
//! # Override the log level
//! relay run --log-level debug
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use relay_api::{build_router, AppState};
use relay_config::{Config, LogFormat};
use relay_filters::{BuiltinFilterFactory, BUILTIN_FILTER_KINDS};
use relay_plugin::{EnvVault, PluginRegistry};
use relay_plugins::DebugPluginFactory;
use relay_route::{InMemoryRouteStorer, RouteStorer};
use relay_tablemgr::{RoutingTableManager, Synchronizer};
use relay_tenant::{InMemoryTenantStorer, TenantStorer};

/// Multi-tenant event-routing gateway
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the gateway (default)
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    init_tracing(&config, cli.log_level.as_deref());

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
    }
}

fn init_tracing(config: &Config, override_level: Option<&str>) {
    let level = override_level.unwrap_or(config.log.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match config.log.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Console => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }
}

fn build_registry() -> Arc<PluginRegistry> {
    let registry = Arc::new(PluginRegistry::with_vault(Arc::new(EnvVault)));
    registry.register_factory("debug", Arc::new(DebugPluginFactory::new()));
    let filter_factory = Arc::new(BuiltinFilterFactory::new());
    for kind in BUILTIN_FILTER_KINDS {
        registry.register_factory(*kind, filter_factory.clone());
    }
    registry
}

async fn run(config: Config) -> Result<()> {
    let registry = build_registry();
    let storer: Arc<dyn RouteStorer> = Arc::new(InMemoryRouteStorer::new());
    let tenants: Arc<dyn TenantStorer> = Arc::new(InMemoryTenantStorer::new());
    let manager = Arc::new(
        RoutingTableManager::new(registry, storer)
            .with_ack_timeout(Duration::from_secs(config.ack.timeout_secs)),
    );

    let synchronizer = Synchronizer::new(Arc::clone(&manager))
        .with_interval(Duration::from_secs(config.sync.interval_secs))
        .spawn();

    let state = AppState::new(
        Arc::clone(&manager),
        tenants,
        config.tenant_cache.ttl_secs,
    )
    .with_webhook(config.webhook.clone());
    let router = build_router(state);

    let addr = config.api.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "relay gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    tracing::info!("shutting down");
    synchronizer.shutdown().await;
    manager.stop_all().await;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received ctrl-c"),
        Err(err) => tracing::error!(error = %err, "cannot listen for shutdown signal"),
    }
}
