//! staticd - hardened static web server
//!
//! Serves a directory tree over HTTP or HTTPS with weak-ETag conditional
//! caching, a fixed set of security headers, a permanent redirect table for
//! legacy paths, an HTTP to HTTPS upgrade listener and an in-band stop
//! command that drains the listeners.

pub mod cli;
pub mod config;
pub mod error;
pub mod files;
pub mod http;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::*;
