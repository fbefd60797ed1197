//! Database models for payments.

use crate::types::{PaymentId, SubscriptionId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for recording a payment
#[derive(Debug, Clone)]
pub struct PaymentCreateDBRequest {
    pub user_id: UserId,
    pub subscription_id: Option<SubscriptionId>,
    pub provider_payment_id: Option<String>,
    pub service_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
}

/// Database request for updating a payment
#[derive(Debug, Clone)]
pub struct PaymentUpdateDBRequest {
    pub status: String,
}

/// Database response for a payment
#[derive(Debug, Clone, FromRow)]
pub struct PaymentDBResponse {
    pub id: PaymentId,
    pub user_id: UserId,
    pub subscription_id: Option<SubscriptionId>,
    pub provider_payment_id: Option<String>,
    pub service_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
