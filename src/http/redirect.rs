//! HTTP to HTTPS upgrade redirects.
//!
//! When the secure listener is active, the plaintext listener serves this
//! router instead of the file resolver and sends every request to the same
//! path and query on `https://<hostName>`.

use std::sync::Arc;

use axum::http::header::UPGRADE_INSECURE_REQUESTS;
use axum::http::{HeaderValue, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::any;
use axum::{middleware, Router};

use super::security::apply_security_headers;
use crate::middleware::request_id_layer;

/// Build the router bound to the plaintext listener in TLS mode.
pub fn upgrade_router(host_name: &str, csp_report_uri: &str) -> Router {
    let host_name: Arc<str> = Arc::from(host_name);

    let router = Router::new().fallback(any(move |uri: Uri| {
        let host_name = Arc::clone(&host_name);
        async move { redirect_to_https(&host_name, &uri) }
    }));

    apply_security_headers(router, csp_report_uri).layer(middleware::from_fn(request_id_layer))
}

/// Secure URL for a plaintext request: `https://<host><path and query>`.
pub fn https_location(host_name: &str, uri: &Uri) -> String {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("https://{host_name}{path_and_query}")
}

/// 307 to the secure origin, with an upgrade hint.
fn redirect_to_https(host_name: &str, uri: &Uri) -> Response {
    let location = https_location(host_name, uri);

    tracing::debug!(from = %uri, to = %location, "Redirecting HTTP to HTTPS");

    let mut response = Redirect::temporary(&location).into_response();
    response
        .headers_mut()
        .insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    response
}
