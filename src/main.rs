// Main entry point for the heic2pdf-server application.
// Parses configuration, initializes the intake backend, configures the Axum
// router, and starts the HTTP server.

use clap::Parser;
use heic2pdf_server::{
    app::create_app,
    intake::{IntakeProvider, LocalIntake, RemoteIntake, RemoteStorageConfig},
    listeners::create_listener,
    shutdown_signal::shutdown_signal,
};
use std::sync::Arc;
use tracing::Level;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StorageBackend {
    /// Spool uploads to the local filesystem and convert in-process.
    Local,
    /// Store uploads in a remote blob store that transcodes to JPEG on ingest.
    Remote,
}

/// Command line arguments for heic2pdf-server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct AppConfig {
    /// Hostname/IP to bind the server to.
    /// If this option is specified without value, it will default to "*", meaning the server will listen on all interfaces.
    #[arg(long, env = "HEIC2PDF_HOST", default_value = "localhost", num_args = 0..=1, default_missing_value = "*")]
    host: String,

    /// Port number to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Directory of static front-end assets served at the root path.
    #[arg(long, env = "HEIC2PDF_PUBLIC_DIR", default_value = "public")]
    public_dir: String,

    /// Transient storage backend for uploaded files.
    #[arg(long, env = "HEIC2PDF_STORAGE", value_enum, default_value = "local")]
    storage: StorageBackend,

    /// Spool directory for the local storage backend.
    #[arg(long, env = "HEIC2PDF_UPLOADS_DIR", default_value = "uploads")]
    uploads_dir: String,

    /// Remote blob store endpoint URL (remote backend only).
    #[arg(long, env = "BLOB_STORE_URL")]
    blob_store_url: Option<String>,

    /// Remote blob store cloud name (remote backend only).
    #[arg(long, env = "CLOUD_NAME")]
    cloud_name: Option<String>,

    /// Remote blob store API key (remote backend only).
    #[arg(long, env = "API_KEY")]
    api_key: Option<String>,

    /// Remote blob store API secret (remote backend only).
    #[arg(long, env = "API_SECRET")]
    api_secret: Option<String>,
}

#[tokio::main]
async fn main() {
    // Parse command line args and environment variables
    let config = AppConfig::parse();

    // Initialize tracing subscriber for structured logging.
    // Logs will go to stdout. Adjust level and format as needed.
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting heic2pdf-server...");

    // --- Initialize the intake backend ---
    // Credentials and paths are resolved once here; request handlers only
    // ever see the constructed provider.
    let intake = match config.storage {
        StorageBackend::Local => {
            tracing::info!("Using local storage backend, spool dir: {}", config.uploads_dir);
            let local = LocalIntake::new(&config.uploads_dir).unwrap_or_else(|err| {
                tracing::error!(
                    "FATAL: Failed to create uploads directory '{}': {}",
                    config.uploads_dir,
                    err
                );
                eprintln!("FATAL: Could not prepare uploads directory. Exiting.");
                std::process::exit(1);
            });
            IntakeProvider::Local(local)
        }
        StorageBackend::Remote => {
            let remote_config = match (
                config.blob_store_url,
                config.cloud_name,
                config.api_key,
                config.api_secret,
            ) {
                (Some(base_url), Some(cloud_name), Some(api_key), Some(api_secret)) => {
                    RemoteStorageConfig {
                        base_url,
                        cloud_name,
                        api_key,
                        api_secret,
                    }
                }
                _ => {
                    tracing::error!(
                        "FATAL: Remote storage backend requires BLOB_STORE_URL, CLOUD_NAME, API_KEY and API_SECRET."
                    );
                    eprintln!("FATAL: Incomplete remote storage configuration. Exiting.");
                    std::process::exit(1);
                }
            };
            tracing::info!(
                "Using remote storage backend at {} (cloud: {})",
                remote_config.base_url,
                remote_config.cloud_name
            );
            IntakeProvider::Remote(RemoteIntake::new(remote_config))
        }
    };

    // --- Build Axum Application Router ---
    let app = create_app(Arc::new(intake), &config.public_dir);
    tracing::info!("Axum router configured.");

    // --- Start HTTP Server ---
    let listener = match create_listener(&config.host, config.port).await {
        Ok((addr, l)) => {
            tracing::info!("Server successfully bound. Listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("FATAL: Failed to bind server: {}", e);
            eprintln!("FATAL: Could not bind server. Error: {}. Exiting.", e);
            std::process::exit(1);
        }
    };

    // Run the server.
    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server run error: {}", e);
        eprintln!("ERROR: Server shut down unexpectedly. Error: {}", e);
    }

    tracing::info!("heic2pdf-server has shut down.");
}
