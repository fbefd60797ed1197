//! Database models for subscriptions.

use crate::types::{SubscriptionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Subscription lifecycle state, stored as lowercase text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
}

/// Database request for creating a new subscription
#[derive(Debug, Clone)]
pub struct SubscriptionCreateDBRequest {
    pub user_id: UserId,
    pub plan_id: String,
    pub provider_subscription_id: Option<String>,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
}

/// Database request for updating a subscription
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdateDBRequest {
    pub status: Option<SubscriptionStatus>,
    pub current_period_end: Option<DateTime<Utc>>,
}

/// Database response for a subscription
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionDBResponse {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: String,
    pub provider_subscription_id: Option<String>,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
