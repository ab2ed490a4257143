//! Request path resolution against the web root.
//!
//! Turns a request path into a [`Resolution`]: a file to serve, a redirect
//! from the [`RedirectTable`], a forbidden reserved file, or nothing. The
//! decision depends only on the path, the filesystem and the startup tables;
//! building the HTTP response is left to the route handler.

pub mod cache;
pub mod metadata;
pub mod redirects;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub use cache::{evaluate, CacheDecision, Validator};
pub use metadata::ContentMetadata;
pub use redirects::{strip_query, RedirectTable};

use crate::config::INDEX_FILE;

/// Outcome of resolving a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The reserved redirect table was requested.
    Forbidden,
    /// An existing regular file under the web root.
    File(Resource),
    /// No file, but the redirect table has a target.
    Redirect(String),
    NotFound,
}

/// A regular file found under the web root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Canonical filesystem path
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

impl Resource {
    pub fn validator(&self) -> Validator {
        Validator::new(self.modified, self.size)
    }

    /// Final path component, used for extension lookups.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

/// Canonical web root plus the reserved redirect-table file inside it.
#[derive(Debug, Clone)]
pub struct WebRoot {
    root: PathBuf,
    reserved_name: String,
    reserved_path: PathBuf,
}

impl WebRoot {
    /// Canonicalize `dir`. The directory must already exist.
    pub fn new(dir: &Path, reserved_name: &str) -> std::io::Result<Self> {
        let root = dir.canonicalize()?;
        let reserved_path = root.join(reserved_name);
        Ok(Self {
            root,
            reserved_name: reserved_name.to_string(),
            reserved_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Location of the redirect table.
    pub fn reserved_path(&self) -> &Path {
        &self.reserved_path
    }

    /// Resolve a raw request path (query string allowed).
    pub async fn resolve(&self, path_and_query: &str, redirects: &RedirectTable) -> Resolution {
        let path = match strip_query(path_and_query) {
            "" | "/" => "/index.html",
            path => path,
        };

        if self.is_reserved(path) {
            return Resolution::Forbidden;
        }

        if let Some(resource) = self.locate(path).await {
            if resource.path == self.reserved_path {
                return Resolution::Forbidden;
            }
            return Resolution::File(resource);
        }

        match redirects.lookup(path) {
            Some(target) => Resolution::Redirect(target.to_string()),
            None => Resolution::NotFound,
        }
    }

    /// Whether a path names the redirect table, after decoding and folding.
    fn is_reserved(&self, path: &str) -> bool {
        match relative_path(path) {
            Some(relative) => relative
                .to_str()
                .is_some_and(|name| name.eq_ignore_ascii_case(&self.reserved_name)),
            None => path
                .strip_prefix('/')
                .is_some_and(|name| name.eq_ignore_ascii_case(&self.reserved_name)),
        }
    }

    /// Find the regular file a path names, substituting `index.html` for
    /// directories. Paths that leave the web root resolve to nothing.
    async fn locate(&self, path: &str) -> Option<Resource> {
        let relative = relative_path(path)?;
        let mut candidate = self.root.join(relative);

        let mut meta = tokio::fs::metadata(&candidate).await.ok()?;
        if meta.is_dir() {
            candidate.push(INDEX_FILE);
            meta = tokio::fs::metadata(&candidate).await.ok()?;
        }
        if !meta.is_file() {
            return None;
        }

        let canonical = tokio::fs::canonicalize(&candidate).await.ok()?;
        if !canonical.starts_with(&self.root) {
            tracing::warn!(
                path = %path,
                resolved = %canonical.display(),
                "Rejected path escaping the web root"
            );
            return None;
        }

        Some(Resource {
            path: canonical,
            size: meta.len(),
            modified: meta.modified().unwrap_or(UNIX_EPOCH),
        })
    }
}

/// Percent-decode a request path and fold `.`/`..` segments.
///
/// Returns `None` for undecodable paths, NUL bytes, backslashes, or `..`
/// climbing above the root.
fn relative_path(path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(path).ok()?;
    if decoded.contains(['\0', '\\']) {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop()?;
            }
            segment => segments.push(segment),
        }
    }

    Some(segments.iter().collect())
}
