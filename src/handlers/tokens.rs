use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};

use crate::auth::token_store::TokenAttr;
use crate::state::AppState;

/// List every token and its attributes. `?pretty=true` returns indented
/// JSON as plain text for reading in a terminal.
pub async fn list_tokens(
    State(state): State<Arc<AppState>>,
    Extension(_attr): Extension<TokenAttr>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let tokens = state.tokens.all();
    if params.get("pretty").map(|v| v == "true").unwrap_or(false) {
        let body = serde_json::to_string_pretty(&tokens).unwrap_or_default();
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response();
    }
    Json(tokens).into_response()
}
