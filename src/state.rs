//! Shared application state for request handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::files::{ContentMetadata, RedirectTable, WebRoot};
use crate::http::ShutdownSignal;
use crate::middleware::RequestLimiter;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Everything except the shutdown signal is built once at startup and never
/// mutated afterwards, so handlers read it without locking.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub web_root: Arc<WebRoot>,
    pub metadata: Arc<ContentMetadata>,
    pub redirects: Arc<RedirectTable>,
    pub limiter: RequestLimiter,
    pub shutdown: ShutdownSignal,
}

impl AppState {
    /// Load the web root, content tables and redirect table for `config`.
    pub fn new(config: AppConfig, shutdown: ShutdownSignal) -> Result<Self, AppError> {
        let web_root = WebRoot::new(&config.web_dir, &config.redirects_file).map_err(AppError::WebDir)?;
        let metadata = ContentMetadata::builtin()?;
        let redirects = RedirectTable::load(web_root.reserved_path())?;
        let limiter = RequestLimiter::new(config.max_requests);

        tracing::info!(
            web_root = %web_root.path().display(),
            redirects = redirects.len(),
            max_requests = config.max_requests,
            "Initialized application state"
        );

        Ok(Self {
            config: Arc::new(config),
            web_root: Arc::new(web_root),
            metadata: Arc::new(metadata),
            redirects: Arc::new(redirects),
            limiter,
            shutdown,
        })
    }
}
