use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::io;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load content tables: {0}")]
    Tables(#[from] serde_json::Error),

    #[error("Web directory unavailable: {0}")]
    WebDir(io::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to build response: {0}")]
    Http(#[from] axum::http::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self, "Internal error");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_error_is_500() {
        let err = AppError::Io(io::Error::other("disk gone"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
