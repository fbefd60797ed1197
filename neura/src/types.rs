//! Common type definitions.
//!
//! All entity IDs are SQLite `INTEGER PRIMARY KEY` row ids wrapped in type aliases:
//!
//! - [`UserId`]: User account identifier
//! - [`ApiKeyId`]: API key identifier
//! - [`SubscriptionId`]: Subscription identifier
//! - [`PaymentId`]: Payment record identifier

use chrono::{DateTime, Utc};

pub type UserId = i64;
pub type ApiKeyId = i64;
pub type SubscriptionId = i64;
pub type PaymentId = i64;

/// Billing month key in `YYYY-MM` form, as stored in `monthly_usage.month`.
pub fn billing_month(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}
