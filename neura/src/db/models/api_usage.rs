//! Database models for per-request API usage records.

use crate::types::ApiKeyId;

/// One served request made with an API key
#[derive(Debug, Clone)]
pub struct ApiUsageCreateDBRequest {
    pub api_key_id: ApiKeyId,
    pub endpoint: String,
    /// Seconds
    pub response_time: f64,
    pub status_code: i64,
}

/// Aggregate usage across all of a user's keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageStats {
    pub total_requests: i64,
    /// Mean response time in seconds, 0.0 when there are no requests
    pub avg_response_time: f64,
    pub unique_endpoints: i64,
}
