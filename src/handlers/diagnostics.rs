use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use tracing::info;

use crate::auth::token_store::TokenAttr;
use crate::models::DiagnosticsResponse;
use crate::state::AppState;

/// Local runtime counters: connected peers, cached paths, current level.
pub async fn diagnostics(
    State(state): State<Arc<AppState>>,
    Extension(_attr): Extension<TokenAttr>,
) -> Json<DiagnosticsResponse> {
    let n_conn = state.registry.peer_count().await as u64;
    let n_cached_files = state.cache.entry_count();
    let level = state.level.current();

    info!("Diagnostics: Conn: {}, Cached: {}, Level: {}", n_conn, n_cached_files, level);

    Json(DiagnosticsResponse {
        n_conn,
        n_cached_files,
        level,
    })
}
