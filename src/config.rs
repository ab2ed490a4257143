//! Configuration loading and constants.
//!
//! Loads server configuration from a JSON file and defines the constants used
//! for response headers, buffer sizes, shutdown timing and default paths.
//! `AppConfig` is the root configuration struct; it is parsed once at startup
//! and never reloaded.

use const_format::formatcp;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

// =============================================================================
// Security Header Values
// =============================================================================

/// HSTS lifetime (one year)
pub const HSTS_MAX_AGE_SECS: u32 = 31_536_000;

pub const STRICT_TRANSPORT_SECURITY: &str =
    formatcp!("max-age={}; includeSubDomains", HSTS_MAX_AGE_SECS);

/// Default endpoint named in the `Content-Security-Policy` report directive
pub const DEFAULT_CSP_REPORT_URI: &str = "/csp-report";

// =============================================================================
// Static Asset Constants
// =============================================================================

/// Document substituted for `/` and for directory requests
pub const INDEX_FILE: &str = "index.html";

/// Size of the buffer used to stream file bodies
pub const COPY_BUFFER_SIZE: usize = 8 * 1024;

/// Content type used when a file extension is not in the table
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Prefix of the in-band shutdown command
pub const STOP_PREFIX: &str = "/stop?key=";

// =============================================================================
// Worker and Shutdown Constants
// =============================================================================

/// Default number of runtime worker threads
pub const DEFAULT_WORKER_THREADS: usize = 8;

/// Default bound on concurrently admitted requests (workers + backlog)
pub const DEFAULT_MAX_REQUESTS: usize = DEFAULT_WORKER_THREADS + 100;

/// How long listeners wait for in-flight requests after shutdown is requested
pub const SHUTDOWN_GRACE_SECS: u64 = 30;

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Default web root
pub const DEFAULT_WEB_DIR: &str = "./www";

/// Default name of the redirect table inside the web root
pub const DEFAULT_REDIRECTS_FILE: &str = "redirects.json";

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Value of `httpsPort` that disables the secure listener
pub const HTTPS_DISABLED: i64 = -1;

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "staticd=info,tower_http=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "AppConfig::default_http_port")]
    pub http_port: u16,
    /// Secure listener port; absent or -1 disables TLS
    #[serde(default)]
    pub https_port: Option<i64>,
    /// Optional bind address; all interfaces when absent
    #[serde(default)]
    pub ip_address: Option<String>,
    /// PEM file holding the certificate chain (and the key unless `private_key` is set)
    #[serde(default)]
    pub keystore: String,
    /// PEM private key, defaults to `keystore`
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub password: String,
    #[serde(default = "AppConfig::default_web_dir")]
    pub web_dir: PathBuf,
    /// Public host used to build upgrade redirects (may carry `:port`)
    #[serde(default)]
    pub host_name: String,
    /// Shared secret for `/stop?key=`; empty disables the command
    #[serde(default)]
    pub stop_word: String,
    #[serde(default = "AppConfig::default_redirects_file")]
    pub redirects_file: String,
    #[serde(default = "AppConfig::default_csp_report_uri")]
    pub csp_report_uri: String,
    #[serde(default = "AppConfig::default_max_requests")]
    pub max_requests: usize,
    #[serde(default = "AppConfig::default_worker_threads")]
    pub worker_threads: usize,
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "AppConfig::default_log_format")]
    pub log_format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: Self::default_http_port(),
            https_port: None,
            ip_address: None,
            keystore: String::new(),
            private_key: None,
            password: String::new(),
            web_dir: Self::default_web_dir(),
            host_name: String::new(),
            stop_word: String::new(),
            redirects_file: Self::default_redirects_file(),
            csp_report_uri: Self::default_csp_report_uri(),
            max_requests: Self::default_max_requests(),
            worker_threads: Self::default_worker_threads(),
            log_format: Self::default_log_format(),
        }
    }
}

impl AppConfig {
    fn default_http_port() -> u16 {
        DEFAULT_HTTP_PORT
    }

    fn default_web_dir() -> PathBuf {
        PathBuf::from(DEFAULT_WEB_DIR)
    }

    fn default_redirects_file() -> String {
        DEFAULT_REDIRECTS_FILE.to_string()
    }

    fn default_csp_report_uri() -> String {
        DEFAULT_CSP_REPORT_URI.to_string()
    }

    fn default_max_requests() -> usize {
        DEFAULT_MAX_REQUESTS
    }

    fn default_worker_threads() -> usize {
        DEFAULT_WORKER_THREADS
    }

    fn default_log_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }

    /// Read, parse and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse and validate configuration text without touching the filesystem.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(port) = self.https_port {
            if port != HTTPS_DISABLED && u16::try_from(port).is_err() {
                return Err(ConfigError::Validation(format!(
                    "httpsPort must be -1 or a valid port, got {port}"
                )));
            }
        }

        if self.tls_enabled() && self.host_name.is_empty() {
            return Err(ConfigError::Validation(
                "hostName is required when httpsPort and keystore are set".to_string(),
            ));
        }

        if self.redirects_file.is_empty()
            || self.redirects_file.contains(['/', '\\'])
            || self.redirects_file == ".."
        {
            return Err(ConfigError::Validation(format!(
                "redirectsFile must be a bare file name, got '{}'",
                self.redirects_file
            )));
        }

        if self.max_requests == 0 || self.worker_threads == 0 {
            return Err(ConfigError::Validation(
                "maxRequests and workerThreads must be greater than zero".to_string(),
            ));
        }

        crate::http::csp_header_value(&self.csp_report_uri).map_err(|e| {
            ConfigError::Validation(format!(
                "Invalid cspReportUri '{}': {e}",
                self.csp_report_uri.escape_debug()
            ))
        })?;

        if let Some(ip) = &self.ip_address {
            ip.parse::<IpAddr>().map_err(|e| {
                ConfigError::Validation(format!("Invalid ipAddress '{ip}': {e}"))
            })?;
        }

        Ok(())
    }

    /// Create the web root if it does not exist yet.
    pub fn ensure_web_dir(&self) -> Result<(), ConfigError> {
        if !self.web_dir.exists() {
            std::fs::create_dir_all(&self.web_dir)?;
            tracing::info!(web_dir = %self.web_dir.display(), "Created web directory");
        }
        Ok(())
    }

    /// Secure listener port, if TLS is configured.
    pub fn https_port(&self) -> Option<u16> {
        self.https_port
            .filter(|port| *port != HTTPS_DISABLED)
            .and_then(|port| u16::try_from(port).ok())
    }

    /// TLS is active only with both a secure port and key material.
    pub fn tls_enabled(&self) -> bool {
        self.https_port().is_some() && !self.keystore.is_empty()
    }

    /// Path of the private key PEM.
    pub fn private_key_path(&self) -> &str {
        self.private_key.as_deref().unwrap_or(&self.keystore)
    }

    fn bind_ip(&self) -> IpAddr {
        self.ip_address
            .as_deref()
            .and_then(|ip| ip.parse().ok())
            .unwrap_or(IpAddr::from([0, 0, 0, 0]))
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip(), self.http_port)
    }

    pub fn https_addr(&self) -> Option<SocketAddr> {
        self.https_port().map(|port| SocketAddr::new(self.bind_ip(), port))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
