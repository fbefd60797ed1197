//! API request/response models for users and authentication.

use crate::types::{ApiKeyId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The API key a request was authenticated with
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyContext {
    pub id: ApiKeyId,
    /// Requests served with this key before the current one
    pub usage_count: i64,
    pub rate_limit: i64,
}

/// The authenticated caller, resolved from an API key or a session token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub plan: String,
    /// Set when the caller authenticated with an API key rather than a session token
    pub api_key: Option<ApiKeyContext>,
}

impl CurrentUser {
    /// Rate limits apply per API key, or per user for session callers
    pub fn rate_limit_key(&self) -> String {
        match &self.api_key {
            Some(key) => format!("key:{}", key.id),
            None => format!("user:{}", self.id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: UserId,
    pub email: String,
    /// The initial API key. It is shown only once.
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    /// Always `bearer`
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
}
