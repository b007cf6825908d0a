//! Restaurant ballot server - Main entry point
//!
//! Voters sign in, pick 15 restaurants, rate each one on food, service and
//! ambience, and submit the ballot once.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ballot_common::config::{prepare_root_folder, resolve_root_folder, TomlConfig};
use ballot_common::db::{candidates, init_database};
use ballot_server::{build_router, AppState};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 5800;
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
const DEFAULT_LOG_FILTER: &str = "ballot_server=info,ballot_common=info,tower_http=info";

/// Command-line arguments for ballot-server
#[derive(Parser, Debug)]
#[command(name = "ballot-server")]
#[command(about = "Restaurant ballot service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "BALLOT_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "BALLOT_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Root folder holding the database (also read from BALLOT_ROOT_FOLDER)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// JSON restaurant catalog to import at startup
    #[arg(short, long, env = "BALLOT_CATALOG")]
    catalog: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::discover();

    // Initialize tracing; RUST_LOG wins over the config file
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        toml_config
            .as_ref()
            .and_then(|c| c.log_level.as_deref())
            .unwrap_or(DEFAULT_LOG_FILTER)
            .into()
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ballot-server v{}", env!("CARGO_PKG_VERSION"));

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), toml_config.as_ref());
    info!("Root folder: {}", root_folder.display());

    let db_path = prepare_root_folder(&root_folder).context("Failed to prepare root folder")?;
    let db = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database: {}", db_path.display());

    let catalog = args
        .catalog
        .or_else(|| toml_config.as_ref().and_then(|c| c.catalog_path.clone()));
    if let Some(path) = catalog {
        let entries = candidates::read_catalog_file(&path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let imported = candidates::import_catalog(&db, &entries)
            .await
            .context("Failed to import catalog")?;
        info!("Imported {} catalog entries from {}", imported, path.display());
    }

    let state = AppState::new(db);
    let app = build_router(state.clone());

    let port = args
        .port
        .or_else(|| toml_config.as_ref().and_then(|c| c.port))
        .unwrap_or(DEFAULT_PORT);
    let bind_address = args
        .bind_address
        .or_else(|| toml_config.as_ref().and_then(|c| c.bind_address.clone()))
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind_address, port))?;

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.shutdown();
    state.db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
