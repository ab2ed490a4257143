//! staticd: a hardened static web server.
//!
//! This is the application entry point. It parses the command line, loads the
//! JSON configuration, initializes tracing, builds the runtime with the
//! configured worker count, loads the shared tables and starts the listeners.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use staticd::cli::Args;
use staticd::config::{AppConfig, DEFAULT_LOG_FILTER, DEFAULT_LOG_FORMAT};
use staticd::http::{start_server, ShutdownSignal};
use staticd::routes::create_router;
use staticd::state::AppState;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::from_env();

    // Load configuration before tracing so the log format can come from it
    let config = AppConfig::load(&args.config);

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    let log_format = config
        .as_ref()
        .map(|c| c.log_format.as_str())
        .unwrap_or(DEFAULT_LOG_FORMAT);
    init_tracing(&log_filter, log_format);

    let config = config.inspect_err(|e| {
        tracing::error!(error = %e, path = %args.config.display(), "Failed to load configuration");
    })?;
    config.ensure_web_dir()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        http_port = config.http_port,
        https_port = ?config.https_port(),
        web_dir = %config.web_dir.display(),
        stop_command = !config.stop_word.is_empty(),
        "Loaded configuration"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = ShutdownSignal::new();

    // Shared read-only tables
    let state = AppState::new(config.clone(), shutdown.clone())?;

    // Create router
    let app = create_router(state);

    // Start listeners; returns once they have drained
    start_server(app, &config, shutdown).await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(filter: &str, format: &str) {
    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(filter));

    if format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
