//! Database models for API keys.

use crate::types::{ApiKeyId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a new API key.
///
/// Only the hash of the key is persisted; the caller keeps the plaintext.
#[derive(Debug, Clone)]
pub struct ApiKeyCreateDBRequest {
    pub user_id: UserId,
    pub name: String,
    pub key_hash: String,
    pub key_prefix: String,
    /// Falls back to the column default when unset
    pub rate_limit: Option<i64>,
}

/// Database request for updating an API key
#[derive(Debug, Clone, Default)]
pub struct ApiKeyUpdateDBRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

/// Database response for an API key
#[derive(Debug, Clone, FromRow)]
pub struct ApiKeyDBResponse {
    pub id: ApiKeyId,
    pub user_id: UserId,
    pub key_hash: String,
    pub key_prefix: String,
    pub name: String,
    pub usage_count: i64,
    pub rate_limit: i64,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// An active API key joined with its active owner, as resolved during authentication
#[derive(Debug, Clone, FromRow)]
pub struct ApiKeyOwner {
    pub api_key_id: ApiKeyId,
    pub user_id: UserId,
    pub email: String,
    pub plan: String,
    pub usage_count: i64,
    pub rate_limit: i64,
}
