use utoipa::OpenApi;

use crate::models::{DiagnosticsResponse, HealthResponse};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Current advisory level
#[utoipa::path(
    get,
    path = "/api/currentlevel",
    responses(
        (status = 200, description = "The current level", body = i64)
    )
)]
#[allow(dead_code)]
pub async fn current_level_doc() {}

/// Runtime diagnostics
#[utoipa::path(
    get,
    path = "/api/diagnostics",
    responses(
        (status = 200, description = "Runtime counters", body = DiagnosticsResponse),
        (status = 401, description = "Missing or unauthorized token")
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        current_level_doc,
        diagnostics_doc,
    ),
    components(
        schemas(HealthResponse, DiagnosticsResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
