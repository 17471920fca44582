//! Health check endpoint.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub store: &'static str,
    pub timestamp: String,
}

/// GET /health
///
/// Reports `degraded` with 503 when the database is configured but unreachable.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let store = store_status(&state).await;
    let healthy = store != "unreachable";

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        store,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    if healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

#[cfg(feature = "postgres")]
async fn store_status(state: &AppState) -> &'static str {
    match &state.db {
        Some(db) => match db.ping().await {
            Ok(()) => "postgres",
            Err(e) => {
                tracing::error!("Database ping failed: {}", e);
                "unreachable"
            }
        },
        None => "memory",
    }
}

#[cfg(not(feature = "postgres"))]
async fn store_status(_state: &AppState) -> &'static str {
    "memory"
}
