mod auth;
mod cache;
mod config;
mod docs;
mod handlers;
mod models;
mod routes;
mod state;
mod ws;

use std::panic;
use std::path::Path;
use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use auth::token_store::TokenStore;
use config::Config;
use docs::ApiDoc;
use routes::api::create_routes;
use state::{load_level_count, AppState};

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "advisory_server=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting advisory server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    if config.is_development() {
        warn!("Running in development mode");
    }

    // Load the credential store; an empty store gets one generated token so
    // the mutation endpoints are reachable out of the box. A present but
    // unreadable store is fatal rather than silently overwritten.
    let tokens = TokenStore::load(Path::new(&config.tokens_file)).unwrap_or_else(|e| {
        panic!("Failed to load token store {}: {}", config.tokens_file, e)
    });
    if tokens.is_empty() {
        match tokens.create("autogen") {
            Ok(token) => info!("Generated token '{}' (note: autogen)", token),
            Err(e) => warn!("Failed to generate startup token: {}", e),
        }
    }
    debug!("{:?}", tokens.all());

    // The level catalogue bounds every mutation; refuse to start without it
    let num_levels = load_level_count(Path::new(&config.levels_file)).unwrap_or_else(|e| {
        panic!("Failed to load level catalogue {}: {}", config.levels_file, e)
    });
    info!("Level catalogue defines {} levels", num_levels);

    let addr = config.server_address();
    let cors = cors_layer(&config);
    let state = Arc::new(AppState::new(config, num_levels, tokens));

    // Combine all routes
    let app_routes = create_routes(state)
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", addr));

    info!("🚀 Server running on http://{}", addr);
    info!("📡 WebSocket available at ws://{}/socket", addr);
    info!("📚 Swagger UI available at http://{}/swagger", addr);

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}

/// CORS layer from configuration: an explicit origin list when configured,
/// permissive otherwise.
fn cors_layer(config: &Config) -> CorsLayer {
    match &config.cors_origins {
        Some(origins) => {
            let list: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            CorsLayer::new().allow_origin(list)
        }
        None => CorsLayer::permissive(),
    }
}
