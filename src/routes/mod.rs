//! HTTP route handlers for the content listener.
//!
//! There are no fixed routes: every request falls through to the static file
//! handler, which also recognizes the stop command. Hardening headers,
//! the admission limit and the request span are layered around it.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod assets;
pub mod stop;

use axum::{middleware, Router};

use crate::http::apply_security_headers;
use crate::middleware::{limit_in_flight, request_id_layer};
use crate::state::AppState;

/// Creates the router that serves the web root.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .fallback(assets::serve)
        .with_state(state.clone());

    apply_security_headers(router, &state.config.csp_report_uri)
        // Admission limit - rejects with 503 once maxRequests are in flight
        .layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            limit_in_flight,
        ))
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
