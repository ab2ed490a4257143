//! HTTP/HTTPS server startup logic.
//!
//! Supports two modes:
//! - Plain: the content router on the HTTP port
//! - TLS: the content router on the HTTPS port, and the upgrade redirector on
//!   the HTTP port

use std::net::SocketAddr;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;

use crate::config::AppConfig;

use super::redirect;
use super::shutdown::{self, ShutdownSignal};

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    #[error("Failed to load TLS configuration: {0}")]
    TlsConfig(String),
}

/// Start the HTTP/HTTPS listeners based on configuration.
///
/// This function blocks until every listener has drained after `shutdown`
/// fires (stop command, SIGTERM or Ctrl+C).
pub async fn start_server(
    app: Router,
    config: &AppConfig,
    shutdown: ShutdownSignal,
) -> Result<(), ServerError> {
    shutdown::watch_os_signals(shutdown.clone());

    match config.https_addr() {
        Some(https_addr) if config.tls_enabled() => {
            start_tls_servers(app, config, https_addr, shutdown).await
        }
        Some(_) => {
            tracing::warn!("httpsPort is set but no keystore is configured, TLS disabled");
            start_plain_server(app, config.http_addr(), shutdown).await
        }
        None => start_plain_server(app, config.http_addr(), shutdown).await,
    }
}

/// Start a plain HTTP server (no TLS).
async fn start_plain_server(
    app: Router,
    addr: SocketAddr,
    shutdown: ShutdownSignal,
) -> Result<(), ServerError> {
    tracing::info!(%addr, "Starting HTTP server (no TLS)");

    let handle = Handle::new();
    shutdown::drain_on_shutdown(handle.clone(), shutdown, "http");

    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    tracing::info!(%addr, "HTTP server stopped");
    Ok(())
}

/// Start the HTTPS content server and the HTTP upgrade redirector.
async fn start_tls_servers(
    app: Router,
    config: &AppConfig,
    https_addr: SocketAddr,
    shutdown: ShutdownSignal,
) -> Result<(), ServerError> {
    let http_addr = config.http_addr();
    let cert_path = config.keystore.clone();
    let key_path = config.private_key_path().to_string();

    tracing::info!(
        %https_addr,
        %http_addr,
        cert = %cert_path,
        key = %key_path,
        host = %config.host_name,
        "Starting HTTPS server"
    );

    install_crypto_provider();

    if !config.password.is_empty() {
        tracing::warn!("Keystore password is ignored, PEM key material must be unencrypted");
    }

    let rustls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
        .await
        .map_err(|e| ServerError::TlsConfig(format!("Failed to load certificates: {}", e)))?;

    // Setup SIGHUP handler for certificate reload
    shutdown::setup_reload_handler(rustls_config.clone(), cert_path, key_path);

    let https_handle = Handle::new();
    shutdown::drain_on_shutdown(https_handle.clone(), shutdown.clone(), "https");

    let http_handle = Handle::new();
    shutdown::drain_on_shutdown(http_handle.clone(), shutdown, "http");

    let upgrade = redirect::upgrade_router(&config.host_name, &config.csp_report_uri);

    let secure = axum_server::bind_rustls(https_addr, rustls_config)
        .handle(https_handle)
        .serve(app.into_make_service());
    let plain = axum_server::bind(http_addr)
        .handle(http_handle)
        .serve(upgrade.into_make_service());

    tokio::try_join!(secure, plain)?;

    tracing::info!("HTTPS and redirect servers stopped");
    Ok(())
}

/// Pin aws-lc-rs as the process-wide rustls provider.
///
/// Both ring and aws-lc-rs may be compiled in. Returns `false` when a provider
/// was already installed, which is kept.
fn install_crypto_provider() -> bool {
    let installed = rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_ok();
    if !installed {
        tracing::debug!("Crypto provider already installed, keeping existing one");
    }
    installed
}
