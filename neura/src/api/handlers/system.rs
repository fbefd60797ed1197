//! Service metadata, health and the bundled dashboard page.

use crate::{
    AppState,
    api::models::system::{ComponentHealth, HealthResponse, ServiceInfo},
    billing::plans::PLANS,
    db, products,
    utils::format_file_size,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
};
use chrono::Utc;
use tracing::{debug, warn};

pub const SERVICE_NAME: &str = "NEURA AI SaaS Factory";

#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    summary = "Service information",
    responses((status = 200, description = "Name, version and available services", body = ServiceInfo))
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        services: products::SERVICE_IDS.iter().map(|s| s.to_string()).collect(),
        pricing_plans: PLANS.iter().map(|p| p.id.to_string()).collect(),
        timestamp: Utc::now(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    summary = "Health check",
    responses(
        (status = 200, description = "All components available", body = HealthResponse),
        (status = 503, description = "The database is unavailable", body = HealthResponse),
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_up = db::ping(&state.db).await;

    let (status_code, status, database) = if database_up {
        (StatusCode::OK, "healthy", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            services: ComponentHealth {
                database: database.to_string(),
                ai_services: "operational".to_string(),
                billing: "active".to_string(),
            },
            timestamp: Utc::now(),
        }),
    )
}

/// Serve the dashboard page configured by `dashboard_path`
pub async fn dashboard(State(state): State<AppState>) -> (StatusCode, Html<String>) {
    match tokio::fs::read_to_string(&state.config.dashboard_path).await {
        Ok(page) => {
            debug!(size = %format_file_size(page.len() as u64), "Serving dashboard");
            (StatusCode::OK, Html(page))
        }
        Err(e) => {
            warn!(path = %state.config.dashboard_path.display(), "Dashboard not available: {}", e);
            (StatusCode::NOT_FOUND, Html("<h1>Dashboard not found</h1>".to_string()))
        }
    }
}
