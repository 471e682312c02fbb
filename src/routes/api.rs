use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers::{diagnostics, files, health, level, tokens};
use crate::routes::auth_middleware::token_auth;
use crate::state::AppState;
use crate::ws::peer::websocket_handler;

/// Assemble the full application router: the public API, the
/// token-protected mutation group, the WebSocket upgrade, and the client
/// file fallback.
pub fn create_routes(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/setlevel", post(level::set_level))
        .route("/inclevel", post(level::increase_level))
        .route("/declevel", post(level::decrease_level))
        .route("/listtokens", get(tokens::list_tokens))
        .route("/diagnostics", get(diagnostics::diagnostics))
        .route_layer(middleware::from_fn_with_state(state.clone(), token_auth)); // Applies to all routes added above

    let api = Router::new()
        .route("/levels", get(files::levels))
        .route("/currentlevel", get(level::current_level))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .merge(protected);

    Router::new()
        .nest("/api", api)
        .route("/socket", get(websocket_handler))
        .fallback(files::index)
        .with_state(state)
}
