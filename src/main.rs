//! URL tracker service entry point.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use url_tracker::api::{create_router, AppState};
use url_tracker::config::{Config, StorageBackend};
use url_tracker::metrics;
use url_tracker::store::PostgresStore;
use url_tracker::utils::{redact, redact_url, shutdown_signal};
use url_tracker::TrackerError;

/// URL tracker service.
#[derive(Parser, Debug)]
#[command(name = "url-tracker")]
#[command(about = "Records target URLs submitted by authenticated clients")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP listening port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,

    /// Persistence backend (overrides STORAGE).
    #[arg(long, value_enum)]
    storage: Option<StorageBackend>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// HTTP listening port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Persistence backend (overrides STORAGE).
        #[arg(long, value_enum)]
        storage: Option<StorageBackend>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Create the schema, table and unique index, then exit.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("url_tracker=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_new(Config::log_filter_from_env())
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if args.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    match args.command {
        Some(Command::Serve { port, storage }) => cmd_serve(port, storage).await,
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Migrate) => cmd_migrate().await,
        None => cmd_serve(args.port, args.storage).await,
    }
}

/// Load and validate configuration, logging failures.
fn load_config() -> url_tracker::Result<Config> {
    info!("Loading configuration...");
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(TrackerError::InvalidConfig(e));
    }

    Ok(config)
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("URL TRACKER - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Storage: {:?}", config.storage);
    println!(
        "  Database: {}@{}:{}/{}",
        config.db_user, config.db_host, config.db_port, config.db_name
    );
    println!("  Password: {}", redact(config.db_password.as_deref()));
    println!("  Schema: {}", config.db_schema);
    println!("  Pool Size: {}", config.db_max_connections);
    println!(
        "  Validation URL: {}",
        config
            .token_validation_url
            .as_deref()
            .map(redact_url)
            .unwrap_or_else(|| "<unset>".to_string())
    );
    println!("  Validation Timeout: {}s", config.token_validation_timeout_secs);
    println!("  Port: {}", config.port);
    println!("  Log Level: {}", config.rust_log);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Create the table and exit.
async fn cmd_migrate() -> anyhow::Result<()> {
    let config = load_config()?;
    PostgresStore::connect(&config).await?;
    info!(schema = %config.db_schema, "Schema is up to date");
    Ok(())
}

/// Run the HTTP server until a shutdown signal arrives.
async fn cmd_serve(port: Option<u16>, storage: Option<StorageBackend>) -> anyhow::Result<()> {
    let mut config = load_config()?;

    // Override with CLI args if provided
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(storage) = storage {
        config.storage = storage;
    }

    info!("Configuration loaded successfully");

    let handle = metrics::install_prometheus()?;
    let _upkeep = metrics::spawn_upkeep(handle.clone(), metrics::UPKEEP_INTERVAL);

    let app_state = AppState::from_config(&config).await?.with_metrics(handle);
    let router = create_router(app_state);

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
