//! Stripe payment provider implementation
//!
//! A subscription needs a customer holding the payment method and a product for the inline
//! monthly price, so creating one takes three calls.

use async_trait::async_trait;
use stripe::{Client, ClientBuilder, StripeError};
use stripe_billing::subscription::{
    CancelSubscription, CreateSubscription, CreateSubscriptionItems, CreateSubscriptionItemsPriceData,
    CreateSubscriptionItemsPriceDataRecurring, CreateSubscriptionItemsPriceDataRecurringInterval,
};
use stripe_core::{customer::CreateCustomer, payment_intent::CreatePaymentIntent};
use stripe_product::product::CreateProduct;
use stripe_types::Currency;
use tracing::{info, instrument};

use crate::{
    config::StripeConfig,
    payment_providers::{PaymentError, PaymentProvider, PlanCharge, ProviderPayment, ProviderSubscription, Result},
};

/// Stripe payment provider
pub struct StripeProvider {
    client: Client,
}

impl StripeProvider {
    /// Create a provider talking to `config.base_url` with the configured secret key
    pub fn new(config: StripeConfig) -> Result<Self> {
        let client = ClientBuilder::new(config.api_key)
            .url(config.base_url)
            .build()
            .map_err(provider_error)?;

        Ok(Self { client })
    }
}

fn provider_error(e: StripeError) -> PaymentError {
    tracing::warn!("Stripe request failed: {:?}", e);
    PaymentError::ProviderApi(e.to_string())
}

fn parse_currency(currency: &str) -> Result<Currency> {
    currency
        .to_lowercase()
        .parse()
        .map_err(|_| PaymentError::InvalidData(format!("unsupported currency: {currency}")))
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    #[instrument(skip(self, plan, payment_method_id), fields(plan_id = %plan.plan_id), err)]
    async fn create_subscription(&self, plan: &PlanCharge, payment_method_id: &str) -> Result<ProviderSubscription> {
        let currency = parse_currency(&plan.currency)?;

        let customer = CreateCustomer::new()
            .email(plan.customer_email.as_str())
            .payment_method(payment_method_id)
            .send(&self.client)
            .await
            .map_err(provider_error)?;

        let product = CreateProduct::new(format!("NEURA AI {} Plan", plan.plan_name))
            .send(&self.client)
            .await
            .map_err(provider_error)?;

        let mut price_data = CreateSubscriptionItemsPriceData::new(
            currency,
            product.id.as_str(),
            CreateSubscriptionItemsPriceDataRecurring::new(CreateSubscriptionItemsPriceDataRecurringInterval::Month),
        );
        price_data.unit_amount = Some(plan.amount_cents);

        let mut item = CreateSubscriptionItems::new();
        item.price_data = Some(price_data);

        let subscription = CreateSubscription::new()
            .customer(customer.id.as_str())
            .default_payment_method(payment_method_id)
            .items(vec![item])
            .metadata([("plan_id".to_string(), plan.plan_id.clone())])
            .send(&self.client)
            .await
            .map_err(provider_error)?;

        info!(subscription_id = %subscription.id, "Created Stripe subscription");
        Ok(ProviderSubscription {
            id: subscription.id.to_string(),
            status: subscription.status.as_str().to_string(),
        })
    }

    #[instrument(skip(self), err)]
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<()> {
        CancelSubscription::new(subscription_id)
            .send(&self.client)
            .await
            .map_err(provider_error)?;

        info!(subscription_id, "Cancelled Stripe subscription");
        Ok(())
    }

    #[instrument(skip(self, payment_method_id), err)]
    async fn charge(&self, amount_cents: i64, currency: &str, payment_method_id: &str, description: &str) -> Result<ProviderPayment> {
        if amount_cents <= 0 {
            return Err(PaymentError::InvalidData(format!("amount must be positive, got {amount_cents}")));
        }

        let intent = CreatePaymentIntent::new(amount_cents, parse_currency(currency)?)
            .payment_method(payment_method_id)
            .payment_method_types(vec!["card".to_string()])
            .description(description)
            .confirm(true)
            .send(&self.client)
            .await
            .map_err(provider_error)?;

        Ok(ProviderPayment {
            id: intent.id.to_string(),
            status: intent.status.as_str().to_string(),
        })
    }
}
