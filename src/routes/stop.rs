//! In-band shutdown command (`/stop?key=<token>`).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::assets::not_found;
use crate::state::AppState;

/// Handle a stop command carrying `token` (the raw text after `key=`).
///
/// A matching token fires the shutdown signal and answers 202; anything else
/// is answered like a missing resource.
pub fn stop(state: &AppState, token: &str) -> Response {
    tracing::info!("Stop requested");

    if accepts(&state.config.stop_word, token) {
        state.shutdown.trigger("stop command");
        StatusCode::ACCEPTED.into_response()
    } else {
        tracing::warn!("Stop request rejected");
        not_found()
    }
}

/// An empty stop word disables the command.
pub fn accepts(stop_word: &str, token: &str) -> bool {
    !stop_word.is_empty() && stop_word == token.trim()
}
