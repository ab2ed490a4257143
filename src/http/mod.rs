//! HTTP server module with TLS support.
//!
//! This module provides the listener bootstrap in two modes:
//! - **Plain**: the content router on the HTTP port
//! - **TLS**: the content router on the HTTPS port, with the HTTP port
//!   redirecting every request to the secure origin
//!
//! The server includes:
//! - Hardening headers on successful and redirected responses
//! - Graceful shutdown on the stop command, SIGTERM or SIGINT
//! - Certificate hot-reload via SIGHUP (TLS mode)

mod redirect;
mod security;
mod server;
mod shutdown;

pub use redirect::{https_location, upgrade_router};
pub use security::{apply_security_headers, csp_header_value, is_hardened, security_headers};
pub use server::{start_server, ServerError};
pub use shutdown::ShutdownSignal;
