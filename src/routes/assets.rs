//! Static file handler.
//!
//! Every request on the content listener lands here. The path is resolved by
//! [`WebRoot::resolve`](crate::files::WebRoot::resolve), then turned into a
//! 200 with a streamed body, a 304, a 301 from the redirect table, a 403 for
//! the reserved redirect file, or a 404.

use std::io;
use std::path::Path;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{
        header::{
            CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LOCATION,
            UPGRADE_INSECURE_REQUESTS,
        },
        HeaderMap, Method, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::instrument;

use super::stop;
use crate::config::{COPY_BUFFER_SIZE, STOP_PREFIX};
use crate::error::AppError;
use crate::files::{evaluate, CacheDecision, Resolution, Resource};
use crate::state::AppState;

/// Fallback handler for all methods and paths.
#[instrument(name = "assets::serve", skip_all)]
pub async fn serve(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    if let Some(token) = path_and_query.strip_prefix(STOP_PREFIX) {
        return stop::stop(&state, token);
    }

    match state.web_root.resolve(path_and_query, &state.redirects).await {
        Resolution::File(resource) => serve_file(&state, &method, &headers, resource)
            .await
            .unwrap_or_else(IntoResponse::into_response),
        Resolution::Redirect(target) => {
            tracing::debug!(to = %target, "Redirect table match");
            (StatusCode::MOVED_PERMANENTLY, [(LOCATION, target)]).into_response()
        }
        Resolution::Forbidden => {
            tracing::warn!("Reserved redirect table requested");
            StatusCode::FORBIDDEN.into_response()
        }
        Resolution::NotFound => {
            tracing::warn!(uri = %uri, "Missing resource requested");
            not_found()
        }
    }
}

/// 404 with an upgrade hint and no body.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, [(UPGRADE_INSECURE_REQUESTS, "1")]).into_response()
}

async fn serve_file(
    state: &AppState,
    method: &Method,
    headers: &HeaderMap,
    resource: Resource,
) -> Result<Response, AppError> {
    let validator = resource.validator();

    if evaluate(headers, &validator) == CacheDecision::NotModified {
        return Ok((StatusCode::NOT_MODIFIED, [(ETAG, validator.to_string())]).into_response());
    }

    let file_name = resource.file_name();
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(ETAG, validator.as_str())
        .header(CONTENT_TYPE, state.metadata.content_type(file_name));
    if let Some(cache_control) = state.metadata.cache_control(file_name) {
        builder = builder.header(CACHE_CONTROL, cache_control);
    }

    let body = if *method == Method::GET {
        let file = File::open(&resource.path).await?;
        builder = builder.header(CONTENT_LENGTH, resource.size);
        file_body(file, &resource.path)
    } else {
        if *method == Method::HEAD {
            builder = builder.header(CONTENT_LENGTH, resource.size);
        }
        Body::empty()
    };

    Ok(builder.body(body)?)
}

/// Stream `file` in fixed-size chunks. Dropping the body closes the file,
/// including when the client goes away mid-transfer.
fn file_body(file: File, path: &Path) -> Body {
    let path = path.to_path_buf();
    let stream = futures::stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let read = file.read(&mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        buf.truncate(read);
        Ok::<_, io::Error>(Some((Bytes::from(buf), file)))
    })
    .inspect_err(move |e| {
        tracing::warn!(error = %e, path = %path.display(), "Failed while streaming file");
    });

    Body::from_stream(stream)
}
