use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use tokio::fs;

use crate::cache::FileMeta;
use crate::models::ApiError;
use crate::state::AppState;

const CACHE_CONTROL_VALUE: &str = "public, no-cache";

/// Serve client files from the configured directory. The root and any path
/// that does not name an existing file fall back to `index.html`.
pub async fn index(State(state): State<Arc<AppState>>, uri: Uri, headers: HeaderMap) -> Response {
    let client_dir = Path::new(&state.config.client_dir);
    let path = resolve_client_path(client_dir, uri.path()).await;
    let content_type = content_type_for(&path);
    match serve_cached(&state, &path, &headers, content_type).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// Serve the level catalogue, always as JSON.
pub async fn levels(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let path = PathBuf::from(&state.config.levels_file);
    match serve_cached(&state, &path, &headers, "application/json").await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// Resolve a file through the content cache and apply the conditional-GET
/// protocol against the inbound `If-None-Match` validator.
async fn serve_cached(
    state: &AppState,
    path: &Path,
    headers: &HeaderMap,
    content_type: &str,
) -> Result<Response, ApiError> {
    let inbound = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());

    // Fresh metadata lets a matching validator short-circuit without
    // touching the file at all.
    if let Some(meta) = state.cache.fresh_meta(path) {
        if inbound == Some(meta.digest.as_str()) {
            return Ok(not_modified(&meta));
        }
    }

    let (bytes, meta) = state.cache.resolve(path).await?;
    if inbound == Some(meta.digest.as_str()) {
        return Ok(not_modified(&meta));
    }

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::ETAG, meta.digest.clone()),
            (header::LAST_MODIFIED, httpdate(meta.modified)),
            (header::CACHE_CONTROL, CACHE_CONTROL_VALUE.to_string()),
        ],
        bytes,
    )
        .into_response())
}

fn not_modified(meta: &FileMeta) -> Response {
    (
        StatusCode::NOT_MODIFIED,
        [
            (header::ETAG, meta.digest.clone()),
            (header::LAST_MODIFIED, httpdate(meta.modified)),
            (header::CACHE_CONTROL, CACHE_CONTROL_VALUE.to_string()),
        ],
    )
        .into_response()
}

/// Map a request path onto the client directory, falling back to
/// `index.html` for the root, for anything that is not an existing file,
/// and for paths trying to climb out of the directory.
async fn resolve_client_path(client_dir: &Path, request_path: &str) -> PathBuf {
    let rel = request_path.trim_start_matches('/');
    if !rel.is_empty() && !rel.split('/').any(|segment| segment == "..") {
        let candidate = client_dir.join(rel);
        if fs::metadata(&candidate)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return candidate;
        }
    }
    client_dir.join("index.html")
}

fn httpdate(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}
