//! Dummy payment provider implementation
//!
//! Every subscription and charge succeeds immediately, without contacting anyone. Useful for
//! development and tests. With `fail_with` set, every operation fails with that message instead.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    config::DummyConfig,
    payment_providers::{PaymentError, PaymentProvider, PlanCharge, ProviderPayment, ProviderSubscription, Result},
};

#[derive(Debug, Default)]
pub struct DummyProvider {
    fail_with: Option<String>,
}

impl DummyProvider {
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
        }
    }

    fn check(&self) -> Result<()> {
        match &self.fail_with {
            Some(message) => Err(PaymentError::ProviderApi(message.clone())),
            None => Ok(()),
        }
    }
}

impl From<DummyConfig> for DummyProvider {
    fn from(config: DummyConfig) -> Self {
        config.fail_with.map(Self::failing).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentProvider for DummyProvider {
    async fn create_subscription(&self, plan: &PlanCharge, _payment_method_id: &str) -> Result<ProviderSubscription> {
        self.check()?;

        let id = format!("sub_dummy_{}", Uuid::new_v4());
        tracing::info!(subscription_id = %id, plan_id = %plan.plan_id, "Dummy provider created subscription");

        Ok(ProviderSubscription {
            id,
            status: "active".to_string(),
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<()> {
        self.check()?;
        tracing::info!(subscription_id, "Dummy provider cancelled subscription");
        Ok(())
    }

    async fn charge(&self, amount_cents: i64, currency: &str, _payment_method_id: &str, description: &str) -> Result<ProviderPayment> {
        self.check()?;

        if amount_cents <= 0 {
            return Err(PaymentError::InvalidData(format!("amount must be positive, got {amount_cents}")));
        }

        let id = format!("pi_dummy_{}", Uuid::new_v4());
        tracing::info!(payment_id = %id, amount_cents, currency, description, "Dummy provider charged");

        Ok(ProviderPayment {
            id,
            status: "succeeded".to_string(),
        })
    }
}
