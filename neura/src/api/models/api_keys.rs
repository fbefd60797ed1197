//! API request/response models for API keys.

use crate::db::models::api_keys::ApiKeyDBResponse;
use crate::types::ApiKeyId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for creating an API key
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct ApiKeyCreateQuery {
    /// Display name for the key
    #[serde(default = "default_key_name")]
    pub name: String,
}

fn default_key_name() -> String {
    "Default".to_string()
}

/// A freshly created key, including its secret
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyCreatedResponse {
    /// The full key. It is shown only once.
    pub api_key: String,
    pub key_id: ApiKeyId,
    pub prefix: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A stored key, without its secret
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyResponse {
    pub id: ApiKeyId,
    pub name: String,
    pub prefix: String,
    pub usage_count: i64,
    pub rate_limit: i64,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl From<ApiKeyDBResponse> for ApiKeyResponse {
    fn from(db: ApiKeyDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            prefix: db.key_prefix,
            usage_count: db.usage_count,
            rate_limit: db.rate_limit,
            created_at: db.created_at,
            last_used: db.last_used,
            is_active: db.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyRevokedResponse {
    pub message: String,
    pub key_id: ApiKeyId,
}
