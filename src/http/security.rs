//! Hardening headers for successful and redirected responses.
//!
//! Each header is installed as an overriding `SetResponseHeaderLayer`, so a
//! name is never duplicated even if a handler already set it. 304 responses
//! carry only their `ETag`, and error responses are left alone.

use axum::response::Response;
use axum::Router;
use axum::http::header::{
    HeaderName, CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY,
    X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION,
};
use axum::http::header::InvalidHeaderValue;
use axum::http::{HeaderValue, StatusCode};
use const_format::formatcp;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config;

/// The fixed hardening header set, with the CSP report endpoint filled in.
///
/// `AppConfig` rejects report URIs that are not valid header text, so the
/// fallback only applies to callers that skip configuration loading.
pub fn security_headers(csp_report_uri: &str) -> Vec<(HeaderName, HeaderValue)> {
    let csp = csp_header_value(csp_report_uri).unwrap_or_else(|e| {
        tracing::warn!(csp_report_uri, error = %e, "Invalid CSP report URI, using default");
        HeaderValue::from_static(formatcp!("report-uri {}", config::DEFAULT_CSP_REPORT_URI))
    });

    vec![
        (X_FRAME_OPTIONS, HeaderValue::from_static("sameorigin")),
        (X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
        (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (
            STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(config::STRICT_TRANSPORT_SECURITY),
        ),
        (
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            HeaderValue::from_static("master-only"),
        ),
        (CONTENT_SECURITY_POLICY, csp),
        (
            REFERRER_POLICY,
            HeaderValue::from_static("no-referrer-when-downgrade"),
        ),
        (
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("microphone=(), camera=()"),
        ),
    ]
}

/// `Content-Security-Policy` value reporting to `csp_report_uri`.
pub fn csp_header_value(csp_report_uri: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!("report-uri {csp_report_uri}"))
}

/// Responses that receive the hardening set: 2xx, and 3xx other than 304.
pub fn is_hardened(status: StatusCode) -> bool {
    status.is_success() || (status.is_redirection() && status != StatusCode::NOT_MODIFIED)
}

/// Wrap `router` with the hardening header layers.
pub fn apply_security_headers<S>(router: Router<S>, csp_report_uri: &str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    security_headers(csp_report_uri)
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::overriding(
                name,
                move |response: &Response| is_hardened(response.status()).then(|| value.clone()),
            ))
        })
}
