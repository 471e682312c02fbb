use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::info;

use crate::models::ApiError;
use crate::state::AppState;

/// Validate the static `Token` header against the credential store and make
/// the token's attributes available to downstream handlers.
pub async fn token_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Get the token from the request
    let token = req
        .headers()
        .get("Token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if token.is_empty() {
        return Err(ApiError::NoToken);
    }

    // 2. A token is authorized only when its level is above zero
    let attr = state.tokens.authed(token).ok_or(ApiError::NotAuthed)?;
    info!("Got authed token with note '{}'", attr.note);

    // 3. Expose the attributes to the handler and continue
    req.extensions_mut().insert(attr);
    Ok(next.run(req).await)
}
