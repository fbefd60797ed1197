//! API request/response models for plans, subscriptions, usage and payments.

use crate::billing::plans::{PLANS, Plan, SERVICE_PRICES};
use crate::db::models::payments::PaymentDBResponse;
use crate::types::SubscriptionId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use utoipa::ToSchema;

/// Public description of a plan
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanDetails {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub requests_per_month: i64,
    pub features: Vec<String>,
}

impl From<&Plan> for PlanDetails {
    fn from(plan: &Plan) -> Self {
        Self {
            name: plan.name.to_string(),
            price: plan.price(),
            requests_per_month: plan.requests_per_month,
            features: plan.features.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Every plan keyed by plan id, serialized in catalog order
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanCatalog;

impl Serialize for PlanCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(PLANS.len()))?;
        for plan in PLANS {
            map.serialize_entry(plan.id, &PlanDetails::from(plan))?;
        }
        map.end()
    }
}

/// Every one-time service price keyed by service id
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceCatalog;

#[derive(Serialize)]
struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Serialize for ServiceCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SERVICE_PRICES.len()))?;
        for service in SERVICE_PRICES {
            map.serialize_entry(service.id, &Price(service.price()))?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlansResponse {
    #[schema(value_type = std::collections::HashMap<String, PlanDetails>)]
    pub plans: PlanCatalog,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServicesResponse {
    #[schema(value_type = std::collections::HashMap<String, f64>)]
    pub services: ServiceCatalog,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscribeRequest {
    pub plan_id: String,
    /// Required for paid plans
    pub payment_method_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionCreatedResponse {
    pub subscription_id: SubscriptionId,
    pub plan_id: String,
    pub plan: PlanDetails,
    pub status: String,
    pub next_billing_date: DateTime<Utc>,
}

/// The caller's active subscription
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionInfo {
    pub subscription_id: SubscriptionId,
    pub plan_id: String,
    pub plan_details: PlanDetails,
    pub status: String,
    pub current_period_end: DateTime<Utc>,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum SubscriptionResponse {
    Active(SubscriptionInfo),
    None { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CancelSubscriptionResponse {
    pub status: String,
    pub message: String,
    pub new_plan: String,
}

/// Whether the caller may make another metered request this month
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UsageLimits {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_usage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

impl UsageLimits {
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// Aggregate API-key usage
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UsageStatistics {
    pub total_requests: i64,
    /// Seconds, rounded to 3 decimals
    pub avg_response_time: f64,
    pub unique_endpoints: i64,
}

/// `GET /billing/usage`: plan limits merged with API-key statistics
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageResponse {
    #[serde(flatten)]
    pub limits: UsageLimits,
    #[serde(flatten)]
    pub statistics: UsageStatistics,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BillingHistoryItem {
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub date: DateTime<Utc>,
}

impl From<PaymentDBResponse> for BillingHistoryItem {
    fn from(payment: PaymentDBResponse) -> Self {
        Self {
            amount: Decimal::new(payment.amount_cents, 2),
            currency: payment.currency,
            status: payment.status,
            date: payment.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BillingHistoryResponse {
    pub history: Vec<BillingHistoryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentRequest {
    pub service_id: String,
    pub payment_method_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    /// The payment provider's id for the charge
    pub payment_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub status: String,
    pub service: String,
}

/// `GET /analytics/dashboard`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsResponse {
    pub usage: UsageStatistics,
    pub subscription: Option<SubscriptionInfo>,
    pub billing_history: Vec<BillingHistoryItem>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_catalog_serializes_in_order() {
        let raw = serde_json::to_string(&PlanCatalog).unwrap();
        let free = raw.find("\"free\"").unwrap();
        let starter = raw.find("\"starter\"").unwrap();
        let enterprise = raw.find("\"enterprise\"").unwrap();
        assert!(free < starter && starter < enterprise);

        let value = serde_json::to_value(PlanCatalog).unwrap();
        assert_eq!(
            value["professional"],
            json!({
                "name": "Professional",
                "price": 99.99,
                "requests_per_month": 25000,
                "features": ["All AI services", "24/7 support", "Custom integrations", "Analytics dashboard"]
            })
        );
    }

    #[test]
    fn test_service_catalog_prices_are_numbers() {
        let value = serde_json::to_value(ServiceCatalog).unwrap();
        assert_eq!(value["logo_basic"], json!(39.99));
        assert_eq!(value.as_object().unwrap().len(), 15);
    }

    #[test]
    fn test_usage_limits_omit_unset_fields() {
        let value = serde_json::to_value(UsageLimits::denied("No active subscription")).unwrap();
        assert_eq!(value, json!({ "allowed": false, "reason": "No active subscription" }));
    }

    #[test]
    fn test_subscription_response_untagged() {
        let value = serde_json::to_value(SubscriptionResponse::None {
            message: "No active subscription".to_string(),
        })
        .unwrap();
        assert_eq!(value, json!({ "message": "No active subscription" }));
    }
}
