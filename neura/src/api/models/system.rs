//! API response models for service metadata and health.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `GET /`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub status: String,
    /// Service ids in registry order
    pub services: Vec<String>,
    /// Plan ids in catalog order
    pub pricing_plans: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ComponentHealth {
    /// `connected` or `unavailable`
    pub database: String,
    pub ai_services: String,
    pub billing: String,
}

/// `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when the database cannot be reached
    pub status: String,
    pub services: ComponentHealth,
    pub timestamp: DateTime<Utc>,
}
