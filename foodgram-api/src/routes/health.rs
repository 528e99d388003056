/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "migrations": "up_to_date"
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use foodgram_shared::db::{migrations::get_migration_status, pool::health_check as db_health};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,

    /// `up_to_date`, `pending` or `unknown`
    pub migrations: String,
}

/// Always answers 200; a broken database shows up as `degraded`
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let connected = db_health(&state.db).await.is_ok();

    let migrations = if connected {
        match get_migration_status(&state.db).await {
            Ok(status) if status.is_up_to_date() => "up_to_date",
            Ok(_) => "pending",
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read migration status");
                "unknown"
            }
        }
    } else {
        "unknown"
    };

    Ok(Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        migrations: migrations.to_string(),
    }))
}
