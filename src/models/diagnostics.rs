use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for the diagnostics endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    /// Currently connected WebSocket peers
    pub n_conn: u64,
    /// Paths held by the content cache
    pub n_cached_files: u64,
    /// Current advisory level
    pub level: i64,
}
