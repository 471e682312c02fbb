use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    Extension, Json,
};
use tracing::info;

use crate::auth::token_store::TokenAttr;
use crate::models::ApiError;
use crate::state::AppState;
use crate::ws::events::BroadcastEvent;

/// Current level as a bare JSON number.
pub async fn current_level(State(state): State<Arc<AppState>>) -> Json<i64> {
    Json(state.level.current())
}

/// Set the level to the value of the `New-Level` header, clamped to the
/// catalogue range, then fan the update out to every connected peer.
pub async fn set_level(
    State(state): State<Arc<AppState>>,
    Extension(attr): Extension<TokenAttr>,
    headers: HeaderMap,
) -> Result<&'static str, ApiError> {
    let raw = headers
        .get("New-Level")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingHeader("New-Level"))?;
    let requested: i64 = raw
        .trim()
        .parse()
        .map_err(|e| ApiError::BadHeader(format!("error processing New-Level: {}", e)))?;

    let level = state.level.set(requested);
    info!("{} setting level to {}", attr.note, level);
    state
        .registry
        .broadcast(BroadcastEvent::level_update(level))
        .await;
    Ok("Level set successfully")
}

pub async fn increase_level(
    State(state): State<Arc<AppState>>,
    Extension(attr): Extension<TokenAttr>,
) -> Result<&'static str, ApiError> {
    let level = state.level.increase();
    info!("{} updating level to {}", attr.note, level);
    state
        .registry
        .broadcast(BroadcastEvent::level_update(level))
        .await;
    Ok("Level set successfully")
}

pub async fn decrease_level(
    State(state): State<Arc<AppState>>,
    Extension(attr): Extension<TokenAttr>,
) -> Result<&'static str, ApiError> {
    let level = state.level.decrease();
    info!("{} updating level to {}", attr.note, level);
    state
        .registry
        .broadcast(BroadcastEvent::level_update(level))
        .await;
    Ok("Level set successfully")
}
