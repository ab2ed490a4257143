//! Request middleware.
//!
//! - Request ID: generates a UUID v4 for each incoming request and creates a
//!   tracing span that wraps the entire request lifecycle, so every log line
//!   emitted while serving it carries the request_id field.
//! - Admission limit: bounds the number of requests being handled at once;
//!   requests beyond the bound are answered 503 immediately.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::Instrument;
use uuid::Uuid;

/// Extension type for accessing request ID in handlers if needed.
#[derive(Clone, Debug)]
pub struct RequestId(pub Uuid);

/// Middleware that generates a request ID and creates a request span.
///
/// This should be the outermost middleware layer so the span wraps
/// all request processing, including other middleware and handlers.
pub async fn request_id_layer(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let path = uri.path();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
        duration_ms = tracing::field::Empty,
    );

    let start = Instant::now();

    let mut request = request;
    request.extensions_mut().insert(RequestId(request_id));

    async move {
        let response = next.run(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::Span::current().record("duration_ms", duration_ms);
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms,
            "Request completed"
        );

        response
    }
    .instrument(span)
    .await
}

/// Shared bound on in-flight requests.
#[derive(Clone, Debug)]
pub struct RequestLimiter {
    permits: Arc<Semaphore>,
}

impl RequestLimiter {
    pub fn new(max_requests: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_requests)),
        }
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Take one slot, or `None` when every slot is in use.
    pub fn try_admit(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.permits).try_acquire_owned().ok()
    }
}

/// Middleware that rejects requests with 503 once the limiter is exhausted.
///
/// The permit is held until the handler returns its response; streamed
/// bodies continue outside the bound.
pub async fn limit_in_flight(
    State(limiter): State<RequestLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let Some(_permit) = limiter.try_admit() else {
        tracing::warn!("Request limit reached, rejecting request");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    next.run(request).await
}
