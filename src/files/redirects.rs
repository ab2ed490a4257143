//! Permanent redirect table for legacy paths.
//!
//! The table lives in a reserved JSON file at the top of the web root and is
//! read exactly once at startup. It is consulted only when no file matches a
//! request; lookup is an exact match on the path without its query string.

use std::collections::HashMap;
use std::path::Path;

use axum::http::HeaderValue;

use crate::config::ConfigError;

#[derive(Debug, Clone, Default)]
pub struct RedirectTable {
    entries: HashMap<String, String>,
}

impl RedirectTable {
    /// Load the table from `path`. A missing file yields an empty table.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No redirect table present");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let table = Self::from_json(&contents).map_err(|e| {
            ConfigError::Validation(format!(
                "Redirect table '{}' must be a JSON object of strings: {}",
                path.display(),
                e
            ))
        })?;

        if let Some((from, to)) = table
            .entries
            .iter()
            .find(|(_, to)| HeaderValue::from_str(to).is_err())
        {
            return Err(ConfigError::Validation(format!(
                "Redirect target for '{from}' is not a valid Location value: {to:?}"
            )));
        }

        tracing::info!(path = %path.display(), entries = table.len(), "Loaded redirect table");
        Ok(table)
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            entries: serde_json::from_str(contents)?,
        })
    }

    /// Redirect target for a request path. Any query string is ignored.
    pub fn lookup(&self, path: &str) -> Option<&str> {
        let path = strip_query(path);
        self.entries.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Drop everything from the first `?`.
pub fn strip_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(path, _)| path)
}
