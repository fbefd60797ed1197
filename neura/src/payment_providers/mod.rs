//! Payment provider abstraction layer
//!
//! This module defines the `PaymentProvider` trait which abstracts recurring subscriptions and
//! one-time charges across payment providers. Providers only talk to the outside world; recording
//! subscriptions and payments is the billing service's job.

use async_trait::async_trait;

use crate::{config::PaymentConfig, db::errors::DbError};

pub mod dummy;
pub mod stripe;

/// Create a payment provider from configuration
///
/// This is the single point where we convert config into provider instances.
/// Adding a new provider requires adding a match arm here.
pub fn create_provider(config: PaymentConfig) -> Result<Box<dyn PaymentProvider>> {
    Ok(match config {
        PaymentConfig::Stripe(stripe_config) => Box::new(stripe::StripeProvider::new(stripe_config)?),
        PaymentConfig::Dummy(dummy_config) => Box::new(dummy::DummyProvider::from(dummy_config)),
    })
}

/// Result type for payment provider operations
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors that can occur during payment processing
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The provider rejected the request or could not be reached; carries the provider's message
    #[error("{0}")]
    ProviderApi(String),

    #[error("Database error: {0}")]
    Database(#[source] DbError),

    #[error("Invalid payment data: {0}")]
    InvalidData(String),

    #[error("Payment already processed")]
    AlreadyProcessed,
}

impl From<DbError> for PaymentError {
    fn from(err: DbError) -> Self {
        match err {
            // A provider payment id can only be recorded once
            DbError::UniqueViolation { ref table, .. } if table.as_deref() == Some("payments") => PaymentError::AlreadyProcessed,
            _ => PaymentError::Database(err),
        }
    }
}

/// A recurring charge for a plan
#[derive(Debug, Clone)]
pub struct PlanCharge {
    pub plan_id: String,
    pub plan_name: String,
    /// Monthly price in the smallest currency unit
    pub amount_cents: i64,
    pub currency: String,
    pub customer_email: String,
}

/// A subscription as created at the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSubscription {
    pub id: String,
    pub status: String,
}

/// A one-time charge as created at the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPayment {
    pub id: String,
    pub status: String,
}

/// Abstract payment provider interface
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Start a monthly subscription for `plan`, paid with `payment_method_id`
    async fn create_subscription(&self, plan: &PlanCharge, payment_method_id: &str) -> Result<ProviderSubscription>;

    /// Cancel a subscription previously returned by [`create_subscription`](Self::create_subscription)
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<()>;

    /// Charge `amount_cents` once
    async fn charge(&self, amount_cents: i64, currency: &str, payment_method_id: &str, description: &str) -> Result<ProviderPayment>;
}
