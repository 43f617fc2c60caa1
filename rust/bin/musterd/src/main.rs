//! `musterd` — the Muster membership server binary.
//!
//! Usage:
//!   musterd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/muster/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod bootstrap;
mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use muster_core::Module;
use tracing::info;

use config::ServerConfig;

/// Muster server.
#[derive(Parser, Debug)]
#[command(name = "musterd", about = "Muster membership server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides default 0.0.0.0:8080).
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;

    // Verify configuration is valid.
    bootstrap::verify_config(&server_config)?;

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = muster_core::ServiceConfig {
        data_dir: Some(data_dir),
        listen: cli.listen.clone(),
        ..Default::default()
    };

    let store = muster_store::DocStore::open(&core_config.resolve_db_path())
        .map_err(|e| anyhow::anyhow!("failed to open document store: {}", e))?;

    // Bootstrap: ensure the administrator role and account exist.
    bootstrap::ensure_admin_account(&store, &server_config.admin.token)?;

    let org_module = org::OrgModule::new(Arc::clone(&store), server_config.org.to_org_config());
    info!("Org module initialized");

    let module_routes = vec![(org_module.name(), org_module.routes())];

    // Build router.
    let app = routes::build_router(module_routes);

    // Start server.
    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!("Muster server listening on {}", cli.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
