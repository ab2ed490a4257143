//! Conditional request handling with weak validators.
//!
//! A file's validator is derived from its modification time and size only,
//! so it is cheap to compute from metadata and changes whenever either does.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::header::{HeaderName, CACHE_CONTROL, IF_NONE_MATCH, PRAGMA};
use axum::http::HeaderMap;

/// Weak entity tag: `W/<mtime millis>L<size>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator(String);

impl Validator {
    pub fn new(modified: SystemTime, size: u64) -> Self {
        let millis = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        Self(format!("W/{millis}L{size}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a presented `If-None-Match` value.
    pub fn matches(&self, presented: &str) -> bool {
        self.0.eq_ignore_ascii_case(presented)
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Send the whole resource with a 200.
    Full,
    /// The client copy is current; answer 304 with only the `ETag`.
    NotModified,
}

/// Decide between a full response and a cache hit.
///
/// A full response is sent when the request disables caching or the
/// presented `If-None-Match` differs from `validator` (or is absent).
pub fn evaluate(headers: &HeaderMap, validator: &Validator) -> CacheDecision {
    if caching_disabled(headers) {
        return CacheDecision::Full;
    }

    match first_header(headers, IF_NONE_MATCH) {
        Some(presented) if validator.matches(presented) => CacheDecision::NotModified,
        _ => CacheDecision::Full,
    }
}

/// `Pragma: no-cache`, `Cache-Control: no-cache` or `Cache-Control: max-age=0`.
fn caching_disabled(headers: &HeaderMap) -> bool {
    let pragma = first_header(headers, PRAGMA);
    let cache_control = first_header(headers, CACHE_CONTROL);

    pragma.is_some_and(|v| v.eq_ignore_ascii_case("no-cache"))
        || cache_control.is_some_and(|v| {
            v.eq_ignore_ascii_case("no-cache") || v.eq_ignore_ascii_case("max-age=0")
        })
}

fn first_header(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}
