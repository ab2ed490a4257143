//! Extension-keyed content type and cache lifetime tables.
//!
//! Both tables are compiled into the binary as JSON, parsed once at startup
//! and shared read-only afterwards. Keys are lowercase extensions including
//! the leading dot (`.css`).

use std::collections::HashMap;

use crate::config::DEFAULT_CONTENT_TYPE;

const CONTENT_TYPES_JSON: &str = include_str!("../../assets/content-types.json");
const CACHE_TIMES_JSON: &str = include_str!("../../assets/cache-times.json");

/// Immutable extension → MIME type and extension → max-age tables.
#[derive(Debug, Clone, Default)]
pub struct ContentMetadata {
    content_types: HashMap<String, String>,
    cache_times: HashMap<String, u64>,
}

impl ContentMetadata {
    /// Build the tables shipped with the server.
    pub fn builtin() -> Result<Self, serde_json::Error> {
        Self::from_json(CONTENT_TYPES_JSON, CACHE_TIMES_JSON)
    }

    pub fn from_json(content_types: &str, cache_times: &str) -> Result<Self, serde_json::Error> {
        let content_types: HashMap<String, String> = serde_json::from_str(content_types)?;
        let cache_times: HashMap<String, u64> = serde_json::from_str(cache_times)?;

        Ok(Self {
            content_types: content_types
                .into_iter()
                .map(|(ext, mime)| (ext.to_ascii_lowercase(), mime))
                .collect(),
            cache_times: cache_times
                .into_iter()
                .map(|(ext, secs)| (ext.to_ascii_lowercase(), secs))
                .collect(),
        })
    }

    /// Content type for a file name, falling back to `text/html`.
    ///
    /// Names without a dot get the fallback silently; an extension missing
    /// from the table is logged.
    pub fn content_type(&self, file_name: &str) -> &str {
        let Some(ext) = extension(file_name) else {
            return DEFAULT_CONTENT_TYPE;
        };
        match self.content_types.get(&ext) {
            Some(mime) => mime.as_str(),
            None => {
                tracing::info!(extension = %ext, "Unknown extension, using default content type");
                DEFAULT_CONTENT_TYPE
            }
        }
    }

    /// `Cache-Control` value for a file name, if its extension has a lifetime.
    pub fn cache_control(&self, file_name: &str) -> Option<String> {
        let ext = extension(file_name)?;
        self.cache_times
            .get(&ext)
            .map(|secs| format!("public, max-age={secs}"))
    }
}

/// Lowercase extension with its leading dot, taken from the final `.`.
fn extension(file_name: &str) -> Option<String> {
    file_name
        .rfind('.')
        .map(|idx| file_name[idx..].to_ascii_lowercase())
}
