//! Subscription, usage and payment operations.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use crate::{
    AppState,
    api::models::{
        billing::{
            BillingHistoryItem, CancelSubscriptionResponse, PaymentResponse, PlanDetails, SubscriptionCreatedResponse, SubscriptionInfo,
            UsageLimits, UsageStatistics,
        },
        users::CurrentUser,
    },
    billing::plans::{self, FREE_PLAN_ID, Plan},
    config::BillingConfig,
    db::{
        errors::DbError,
        handlers::{
            ApiUsage, MonthlyUsage, Payments, Repository, Subscriptions, Users, payments::PaymentFilter,
            subscriptions::SubscriptionFilter,
        },
        models::{
            payments::PaymentCreateDBRequest,
            subscriptions::{SubscriptionCreateDBRequest, SubscriptionDBResponse, SubscriptionStatus},
            users::UserUpdateDBRequest,
        },
    },
    errors::{Error, Result},
    payment_providers::{PaymentError, PaymentProvider, PlanCharge, ProviderSubscription},
    types::{UserId, billing_month},
};

const CURRENCY: &str = "usd";

/// Outcome of [`Billing::reserve_usage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageReservation {
    /// One request was counted against `month`
    Reserved { month: String },
    Denied { reason: String },
}

/// Billing operations over the database and the configured payment provider.
pub struct Billing<'a> {
    db: &'a SqlitePool,
    provider: &'a dyn PaymentProvider,
    config: &'a BillingConfig,
}

impl<'a> Billing<'a> {
    pub fn new(db: &'a SqlitePool, provider: &'a dyn PaymentProvider, config: &'a BillingConfig) -> Self {
        Self { db, provider, config }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(&state.db, state.payment_provider.as_ref(), &state.config.billing)
    }

    fn period(&self) -> Duration {
        Duration::from_std(self.config.billing_period).unwrap_or_else(|_| Duration::days(30))
    }

    /// Subscribe `user` to `plan_id`, replacing any active subscription.
    ///
    /// Paid plans are created at the payment provider first; nothing is written locally if that fails,
    /// and the provider subscription is cancelled again if the local write fails. Replaced provider
    /// subscriptions are only cancelled once the new one is stored.
    #[instrument(skip(self, user, payment_method_id), fields(user_id = user.id), err)]
    pub async fn create_subscription(
        &self,
        user: &CurrentUser,
        plan_id: &str,
        payment_method_id: Option<&str>,
    ) -> Result<SubscriptionCreatedResponse> {
        let plan = plans::plan(plan_id).ok_or_else(|| Error::bad_request("Invalid plan"))?;

        let provider_subscription = if plan.is_free() {
            None
        } else {
            let payment_method_id = payment_method_id
                .filter(|pm| !pm.trim().is_empty())
                .ok_or_else(|| Error::bad_request("payment_method_id is required for paid plans"))?;
            let charge = PlanCharge {
                plan_id: plan.id.to_string(),
                plan_name: plan.name.to_string(),
                amount_cents: plan.price_cents,
                currency: CURRENCY.to_string(),
                customer_email: user.email.clone(),
            };
            let subscription = self
                .provider
                .create_subscription(&charge, payment_method_id)
                .await
                .map_err(|e| Error::bad_request(format!("Payment failed: {e}")))?;
            Some(subscription)
        };

        let (subscription, replaced) = match self.record_subscription(user.id, plan, provider_subscription.as_ref()).await {
            Ok(recorded) => recorded,
            Err(e) => {
                // Nothing was stored, so the new provider subscription must not keep billing
                if let Some(orphan) = &provider_subscription
                    && let Err(cancel_err) = self.provider.cancel_subscription(&orphan.id).await
                {
                    warn!(provider_subscription_id = %orphan.id, "Failed to cancel unrecorded subscription at provider: {}", cancel_err);
                }
                return Err(e);
            }
        };

        for provider_id in replaced.iter().filter_map(|s| s.provider_subscription_id.as_deref()) {
            if let Err(e) = self.provider.cancel_subscription(provider_id).await {
                warn!(provider_subscription_id = provider_id, "Failed to cancel replaced subscription at provider: {}", e);
            }
        }

        info!(subscription_id = subscription.id, plan_id = plan.id, "Subscription created");
        Ok(SubscriptionCreatedResponse {
            subscription_id: subscription.id,
            plan_id: plan.id.to_string(),
            plan: PlanDetails::from(plan),
            status: "active".to_string(),
            next_billing_date: subscription.current_period_end,
        })
    }

    /// Replace the user's active subscriptions with a new one in a single transaction.
    /// Returns the new row and the rows it replaced.
    async fn record_subscription(
        &self,
        user_id: UserId,
        plan: &Plan,
        provider_subscription: Option<&ProviderSubscription>,
    ) -> Result<(SubscriptionDBResponse, Vec<SubscriptionDBResponse>)> {
        let now = Utc::now();
        let mut tx = self.db.begin().await.map_err(DbError::from)?;

        let replaced = Subscriptions::new(&mut tx)
            .list(&SubscriptionFilter {
                user_id: Some(user_id),
                status: Some(SubscriptionStatus::Active),
            })
            .await?;
        Subscriptions::new(&mut tx).cancel_all_for_user(user_id).await?;
        let subscription = Subscriptions::new(&mut tx)
            .create(&SubscriptionCreateDBRequest {
                user_id,
                plan_id: plan.id.to_string(),
                provider_subscription_id: provider_subscription.map(|s| s.id.clone()),
                current_period_start: now,
                current_period_end: now + self.period(),
            })
            .await?;
        Users::new(&mut tx).update(user_id, &UserUpdateDBRequest::plan(plan.id)).await?;

        if let Some(provider_subscription) = provider_subscription {
            Payments::new(&mut tx)
                .create(&PaymentCreateDBRequest {
                    user_id,
                    subscription_id: Some(subscription.id),
                    provider_payment_id: None,
                    service_id: None,
                    amount_cents: plan.price_cents,
                    currency: CURRENCY.to_string(),
                    status: provider_subscription.status.clone(),
                })
                .await?;
        }

        tx.commit().await.map_err(DbError::from)?;
        Ok((subscription, replaced))
    }

    /// The user's latest active subscription, if any
    #[instrument(skip(self), err)]
    pub async fn get_user_subscription(&self, user_id: UserId) -> Result<Option<SubscriptionInfo>> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;

        let Some(subscription) = Subscriptions::new(&mut conn).get_active_for_user(user_id).await? else {
            return Ok(None);
        };
        let user = Users::new(&mut conn).get_by_id(user_id).await?.ok_or(DbError::NotFound)?;

        Ok(Some(SubscriptionInfo {
            subscription_id: subscription.id,
            plan_details: PlanDetails::from(plan_for(&subscription)),
            plan_id: subscription.plan_id,
            status: "active".to_string(),
            current_period_end: subscription.current_period_end,
            email: user.email,
        }))
    }

    /// Compare this month's request count against the active plan's quota
    #[instrument(skip(self), err)]
    pub async fn check_usage_limits(&self, user_id: UserId) -> Result<UsageLimits> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;

        let Some(subscription) = Subscriptions::new(&mut conn).get_active_for_user(user_id).await? else {
            return Ok(UsageLimits::denied("No active subscription"));
        };
        let plan = plan_for(&subscription);

        let usage = MonthlyUsage::new(&mut conn)
            .requests_for(user_id, &billing_month(Utc::now()))
            .await?;

        Ok(UsageLimits {
            allowed: usage < plan.requests_per_month,
            reason: None,
            current_usage: Some(usage),
            monthly_limit: Some(plan.requests_per_month),
            remaining: Some((plan.requests_per_month - usage).max(0)),
            plan: Some(plan.id.to_string()),
        })
    }

    /// Count one request against the current month. Returns the new count.
    #[instrument(skip(self), err)]
    pub async fn increment_usage(&self, user_id: UserId) -> Result<i64> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let count = MonthlyUsage::new(&mut conn).increment(user_id, &billing_month(Utc::now())).await?;
        Ok(count)
    }

    /// Count one request against the active plan's quota, refusing it once the quota is used up.
    ///
    /// The check and the count are a single statement, so concurrent requests cannot overrun the quota.
    #[instrument(skip(self), err)]
    pub async fn reserve_usage(&self, user_id: UserId) -> Result<UsageReservation> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;

        let Some(subscription) = Subscriptions::new(&mut conn).get_active_for_user(user_id).await? else {
            return Ok(UsageReservation::Denied {
                reason: "No active subscription".to_string(),
            });
        };
        let plan = plan_for(&subscription);

        let month = billing_month(Utc::now());
        match MonthlyUsage::new(&mut conn).reserve(user_id, &month, plan.requests_per_month).await? {
            Some(_) => Ok(UsageReservation::Reserved { month }),
            None => Ok(UsageReservation::Denied {
                reason: "Monthly request limit exceeded".to_string(),
            }),
        }
    }

    /// Undo a [`reserve_usage`](Self::reserve_usage) for a request that did not succeed
    #[instrument(skip(self), err)]
    pub async fn release_usage(&self, user_id: UserId, month: &str) -> Result<()> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        MonthlyUsage::new(&mut conn).release(user_id, month).await?;
        Ok(())
    }

    /// Cancel the active subscription and drop the user back to the free plan
    #[instrument(skip(self), err)]
    pub async fn cancel_subscription(&self, user_id: UserId) -> Result<CancelSubscriptionResponse> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let subscription = Subscriptions::new(&mut conn)
            .get_active_for_user(user_id)
            .await?
            .ok_or_else(|| Error::not_found("No active subscription found"))?;
        drop(conn);

        if let Some(provider_id) = subscription.provider_subscription_id.as_deref()
            && subscription.plan_id != FREE_PLAN_ID
        {
            self.provider
                .cancel_subscription(provider_id)
                .await
                .map_err(|e| Error::bad_request(format!("Cancellation failed: {e}")))?;
        }

        let mut tx = self.db.begin().await.map_err(DbError::from)?;
        let cancelled = Subscriptions::new(&mut tx).cancel_all_for_user(user_id).await?;
        Users::new(&mut tx).update(user_id, &UserUpdateDBRequest::plan(FREE_PLAN_ID)).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(cancelled, "Subscription cancelled");
        Ok(CancelSubscriptionResponse {
            status: "cancelled".to_string(),
            message: "Subscription cancelled successfully".to_string(),
            new_plan: FREE_PLAN_ID.to_string(),
        })
    }

    /// Payments, newest first
    #[instrument(skip(self), err)]
    pub async fn get_billing_history(&self, user_id: UserId) -> Result<Vec<BillingHistoryItem>> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let payments = Payments::new(&mut conn).list(&PaymentFilter::for_user(user_id)).await?;

        Ok(payments.into_iter().map(Into::into).collect())
    }

    /// Charge for a one-time service and record the payment.
    ///
    /// Recording is idempotent on the provider payment id: a replayed charge returns the
    /// payment already on file.
    #[instrument(skip(self, user, payment_method_id), fields(user_id = user.id), err)]
    pub async fn process_payment(&self, user: &CurrentUser, service_id: &str, payment_method_id: &str) -> Result<PaymentResponse> {
        let service = plans::service_price(service_id).ok_or_else(|| Error::bad_request("Invalid service"))?;

        let payment = self
            .provider
            .charge(service.price_cents, CURRENCY, payment_method_id, service.id)
            .await
            .map_err(|e| Error::bad_request(format!("Payment failed: {e}")))?;

        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let mut repo = Payments::new(&mut conn);
        let created = repo
            .create(&PaymentCreateDBRequest {
                user_id: user.id,
                subscription_id: None,
                provider_payment_id: Some(payment.id.clone()),
                service_id: Some(service.id.to_string()),
                amount_cents: service.price_cents,
                currency: CURRENCY.to_string(),
                status: payment.status.clone(),
            })
            .await;

        let record = match created.map_err(PaymentError::from) {
            Ok(record) => record,
            Err(PaymentError::AlreadyProcessed) => {
                info!(provider_payment_id = %payment.id, "Payment already recorded");
                repo.get_by_provider_id(&payment.id).await?.ok_or(DbError::NotFound)?
            }
            Err(e) => {
                return Err(Error::Internal {
                    operation: format!("record payment: {e}"),
                });
            }
        };

        Ok(PaymentResponse {
            payment_id: payment.id,
            amount: Decimal::new(record.amount_cents, 2),
            status: record.status,
            service: service.id.to_string(),
        })
    }

    /// Aggregate API-key usage for the user
    #[instrument(skip(self), err)]
    pub async fn get_user_usage(&self, user_id: UserId) -> Result<UsageStatistics> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let stats = ApiUsage::new(&mut conn).stats_for_user(user_id).await?;

        Ok(UsageStatistics {
            total_requests: stats.total_requests,
            avg_response_time: (stats.avg_response_time * 1000.0).round() / 1000.0,
            unique_endpoints: stats.unique_endpoints,
        })
    }

    /// Put a newly registered user on the free plan
    pub async fn provision_free_plan(conn: &mut sqlx::SqliteConnection, user_id: UserId, period: std::time::Duration) -> Result<()> {
        let now = Utc::now();
        let period = Duration::from_std(period).unwrap_or_else(|_| Duration::days(30));

        Subscriptions::new(conn)
            .create(&SubscriptionCreateDBRequest {
                user_id,
                plan_id: FREE_PLAN_ID.to_string(),
                provider_subscription_id: None,
                current_period_start: now,
                current_period_end: now + period,
            })
            .await?;
        Ok(())
    }
}

/// The catalog entry for a stored subscription. Retired plan ids fall back to the free plan.
fn plan_for(subscription: &SubscriptionDBResponse) -> &'static Plan {
    plans::plan(&subscription.plan_id).unwrap_or_else(|| {
        warn!(plan_id = %subscription.plan_id, "Subscription references unknown plan, applying free limits");
        plans::free_plan()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        payment_providers::dummy::DummyProvider,
        test_utils::{create_test_api_key, create_test_user, current_user_for},
    };
    use crate::db::{handlers::ApiUsage, models::api_usage::ApiUsageCreateDBRequest};
    use axum::http::StatusCode;

    fn billing<'a>(pool: &'a SqlitePool, provider: &'a DummyProvider, config: &'a BillingConfig) -> Billing<'a> {
        Billing::new(pool, provider, config)
    }

    /// Succeeds like the dummy provider and remembers every cancellation
    #[derive(Default)]
    struct RecordingProvider {
        inner: DummyProvider,
        cancelled: std::sync::Mutex<Vec<String>>,
    }

    impl RecordingProvider {
        fn cancelled(&self) -> Vec<String> {
            self.cancelled.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl PaymentProvider for RecordingProvider {
        async fn create_subscription(&self, plan: &PlanCharge, payment_method_id: &str) -> crate::payment_providers::Result<ProviderSubscription> {
            self.inner.create_subscription(plan, payment_method_id).await
        }

        async fn cancel_subscription(&self, subscription_id: &str) -> crate::payment_providers::Result<()> {
            self.cancelled.lock().unwrap().push(subscription_id.to_string());
            Ok(())
        }

        async fn charge(
            &self,
            amount_cents: i64,
            currency: &str,
            payment_method_id: &str,
            description: &str,
        ) -> crate::payment_providers::Result<crate::payment_providers::ProviderPayment> {
            self.inner.charge(amount_cents, currency, payment_method_id, description).await
        }
    }

    async fn active_subscription(pool: &SqlitePool, user_id: UserId) -> Option<SubscriptionDBResponse> {
        let mut conn = pool.acquire().await.unwrap();
        Subscriptions::new(&mut conn).get_active_for_user(user_id).await.unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_no_subscription_is_denied(pool: SqlitePool) {
        let (provider, config) = (DummyProvider::default(), BillingConfig::default());
        let user = create_test_user(&pool, "none@example.com").await;

        let limits = billing(&pool, &provider, &config).check_usage_limits(user.id).await.unwrap();
        assert_eq!(limits, UsageLimits::denied("No active subscription"));
        assert!(billing(&pool, &provider, &config).get_user_subscription(user.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_free_subscription_limits(pool: SqlitePool) {
        let (provider, config) = (DummyProvider::default(), BillingConfig::default());
        let user = create_test_user(&pool, "free@example.com").await;
        let billing = billing(&pool, &provider, &config);

        let created = billing.create_subscription(&current_user_for(&user), "free", None).await.unwrap();
        assert_eq!(created.plan_id, "free");
        assert_eq!(created.plan.name, "Free");
        assert_eq!(created.status, "active");

        for _ in 0..3 {
            billing.increment_usage(user.id).await.unwrap();
        }

        let limits = billing.check_usage_limits(user.id).await.unwrap();
        assert!(limits.allowed);
        assert_eq!(limits.current_usage, Some(3));
        assert_eq!(limits.monthly_limit, Some(100));
        assert_eq!(limits.remaining, Some(97));
        assert_eq!(limits.plan.as_deref(), Some("free"));
        // Free plans never create a payment
        assert!(billing.get_billing_history(user.id).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_quota_exhausted(pool: SqlitePool) {
        let (provider, config) = (DummyProvider::default(), BillingConfig::default());
        let user = create_test_user(&pool, "heavy@example.com").await;
        let billing = billing(&pool, &provider, &config);
        billing.create_subscription(&current_user_for(&user), "free", None).await.unwrap();

        for _ in 0..101 {
            billing.increment_usage(user.id).await.unwrap();
        }

        let limits = billing.check_usage_limits(user.id).await.unwrap();
        assert!(!limits.allowed);
        assert_eq!(limits.remaining, Some(0));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_reserve_usage(pool: SqlitePool) {
        let (provider, config) = (DummyProvider::default(), BillingConfig::default());
        let user = create_test_user(&pool, "reserve@example.com").await;
        let billing = billing(&pool, &provider, &config);

        assert_eq!(
            billing.reserve_usage(user.id).await.unwrap(),
            UsageReservation::Denied {
                reason: "No active subscription".to_string()
            }
        );

        billing.create_subscription(&current_user_for(&user), "free", None).await.unwrap();
        for _ in 0..99 {
            billing.increment_usage(user.id).await.unwrap();
        }

        let UsageReservation::Reserved { month } = billing.reserve_usage(user.id).await.unwrap() else {
            panic!("the hundredth request should fit the free quota");
        };
        assert_eq!(
            billing.reserve_usage(user.id).await.unwrap(),
            UsageReservation::Denied {
                reason: "Monthly request limit exceeded".to_string()
            }
        );

        billing.release_usage(user.id, &month).await.unwrap();
        assert_eq!(billing.check_usage_limits(user.id).await.unwrap().current_usage, Some(99));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_paid_subscription_replaces_previous(pool: SqlitePool) {
        let (provider, config) = (DummyProvider::default(), BillingConfig::default());
        let user = create_test_user(&pool, "upgrade@example.com").await;
        let current = current_user_for(&user);
        let billing = billing(&pool, &provider, &config);

        billing.create_subscription(&current, "free", None).await.unwrap();
        let created = billing
            .create_subscription(&current, "professional", Some("pm_card_visa"))
            .await
            .unwrap();

        let info = billing.get_user_subscription(user.id).await.unwrap().unwrap();
        assert_eq!(info.subscription_id, created.subscription_id);
        assert_eq!(info.plan_id, "professional");
        assert_eq!(info.plan_details.requests_per_month, 25000);
        assert_eq!(info.email, "upgrade@example.com");

        let mut conn = pool.acquire().await.unwrap();
        let stored_user = Users::new(&mut conn).get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored_user.plan, "professional");

        let active = Subscriptions::new(&mut conn)
            .list(&crate::db::handlers::subscriptions::SubscriptionFilter {
                user_id: Some(user.id),
                status: Some(crate::db::models::subscriptions::SubscriptionStatus::Active),
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 1);

        let history = billing.get_billing_history(user.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].amount.to_string(), "99.99");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_invalid_plan_and_missing_payment_method(pool: SqlitePool) {
        let (provider, config) = (DummyProvider::default(), BillingConfig::default());
        let user = create_test_user(&pool, "bad@example.com").await;
        let billing = billing(&pool, &provider, &config);

        let err = billing.create_subscription(&current_user_for(&user), "platinum", None).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "Invalid plan");

        let err = billing.create_subscription(&current_user_for(&user), "starter", None).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_provider_failure_writes_nothing(pool: SqlitePool) {
        let provider = DummyProvider::failing("Your card was declined.");
        let config = BillingConfig::default();
        let user = create_test_user(&pool, "declined@example.com").await;
        let billing = billing(&pool, &provider, &config);

        let err = billing
            .create_subscription(&current_user_for(&user), "starter", Some("pm_card_chargeDeclined"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Payment failed: Your card was declined.");
        assert!(billing.get_user_subscription(user.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cancel_subscription(pool: SqlitePool) {
        let (provider, config) = (DummyProvider::default(), BillingConfig::default());
        let user = create_test_user(&pool, "cancel@example.com").await;
        let billing = billing(&pool, &provider, &config);

        let err = billing.cancel_subscription(user.id).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "No active subscription found");

        billing
            .create_subscription(&current_user_for(&user), "starter", Some("pm_card_visa"))
            .await
            .unwrap();
        let cancelled = billing.cancel_subscription(user.id).await.unwrap();
        assert_eq!(cancelled.status, "cancelled");
        assert_eq!(cancelled.new_plan, "free");

        assert!(billing.get_user_subscription(user.id).await.unwrap().is_none());
        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(Users::new(&mut conn).get_by_id(user.id).await.unwrap().unwrap().plan, "free");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_replaced_subscription_cancelled_at_provider(pool: SqlitePool) {
        let (provider, config) = (RecordingProvider::default(), BillingConfig::default());
        let user = create_test_user(&pool, "switch@example.com").await;
        let current = current_user_for(&user);
        let billing = Billing::new(&pool, &provider, &config);

        billing.create_subscription(&current, "starter", Some("pm_card_visa")).await.unwrap();
        let starter = active_subscription(&pool, user.id).await.unwrap();
        assert!(provider.cancelled().is_empty());

        let created = billing
            .create_subscription(&current, "professional", Some("pm_card_visa"))
            .await
            .unwrap();
        assert_eq!(created.plan_id, "professional");
        assert_eq!(created.plan.requests_per_month, 25000);

        assert_eq!(provider.cancelled(), vec![starter.provider_subscription_id.unwrap()]);
        let active = active_subscription(&pool, user.id).await.unwrap();
        assert_eq!(active.id, created.subscription_id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_failed_local_write_cancels_new_provider_subscription(pool: SqlitePool) {
        let (provider, config) = (RecordingProvider::default(), BillingConfig::default());
        let billing = Billing::new(&pool, &provider, &config);
        // No such user row, so storing the subscription fails after the provider call
        let ghost = CurrentUser {
            id: 9999,
            email: "ghost@example.com".to_string(),
            plan: "free".to_string(),
            api_key: None,
        };

        billing
            .create_subscription(&ghost, "starter", Some("pm_card_visa"))
            .await
            .unwrap_err();

        let cancelled = provider.cancelled();
        assert_eq!(cancelled.len(), 1);
        assert!(cancelled[0].starts_with("sub_dummy_"));
        assert!(active_subscription(&pool, ghost.id).await.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cancel_provider_failure_keeps_subscription(pool: SqlitePool) {
        let (provider, config) = (DummyProvider::default(), BillingConfig::default());
        let user = create_test_user(&pool, "stuck@example.com").await;
        let created = billing(&pool, &provider, &config)
            .create_subscription(&current_user_for(&user), "starter", Some("pm_card_visa"))
            .await
            .unwrap();

        let failing = DummyProvider::failing("No such subscription");
        let err = billing(&pool, &failing, &config).cancel_subscription(user.id).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "Cancellation failed: No such subscription");

        let active = active_subscription(&pool, user.id).await.unwrap();
        assert_eq!(active.id, created.subscription_id);
        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(Users::new(&mut conn).get_by_id(user.id).await.unwrap().unwrap().plan, "starter");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_plan_id_gets_free_limits(pool: SqlitePool) {
        let (provider, config) = (DummyProvider::default(), BillingConfig::default());
        let user = create_test_user(&pool, "legacy@example.com").await;

        let now = Utc::now();
        let mut conn = pool.acquire().await.unwrap();
        Subscriptions::new(&mut conn)
            .create(&SubscriptionCreateDBRequest {
                user_id: user.id,
                plan_id: "retired".to_string(),
                provider_subscription_id: None,
                current_period_start: now,
                current_period_end: now + Duration::days(30),
            })
            .await
            .unwrap();
        drop(conn);

        let billing = billing(&pool, &provider, &config);
        let limits = billing.check_usage_limits(user.id).await.unwrap();
        assert!(limits.allowed);
        assert_eq!(limits.monthly_limit, Some(100));
        assert_eq!(limits.plan.as_deref(), Some("free"));

        let info = billing.get_user_subscription(user.id).await.unwrap().unwrap();
        assert_eq!(info.plan_id, "retired");
        assert_eq!(info.plan_details.name, "Free");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_process_payment(pool: SqlitePool) {
        let (provider, config) = (DummyProvider::default(), BillingConfig::default());
        let user = create_test_user(&pool, "buyer@example.com").await;
        let billing = billing(&pool, &provider, &config);

        let payment = billing
            .process_payment(&current_user_for(&user), "logo_premium", "pm_card_visa")
            .await
            .unwrap();
        assert!(payment.payment_id.starts_with("pi_dummy_"));
        assert_eq!(payment.amount.to_string(), "79.99");
        assert_eq!(payment.status, "succeeded");
        assert_eq!(payment.service, "logo_premium");

        let err = billing
            .process_payment(&current_user_for(&user), "unknown_service", "pm_card_visa")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Invalid service");

        let history = billing.get_billing_history(user.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].currency, "usd");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_user_usage_rounds_response_time(pool: SqlitePool) {
        let (provider, config) = (DummyProvider::default(), BillingConfig::default());
        let user = create_test_user(&pool, "stats@example.com").await;
        let (key, _) = create_test_api_key(&pool, user.id).await;

        let mut conn = pool.acquire().await.unwrap();
        for response_time in [0.1234, 0.2] {
            ApiUsage::new(&mut conn)
                .record(&ApiUsageCreateDBRequest {
                    api_key_id: key.id,
                    endpoint: "/api/names/generate".to_string(),
                    response_time,
                    status_code: 200,
                })
                .await
                .unwrap();
        }

        let usage = billing(&pool, &provider, &config).get_user_usage(user.id).await.unwrap();
        assert_eq!(usage.total_requests, 2);
        assert_eq!(usage.unique_endpoints, 1);
        assert_eq!(usage.avg_response_time, 0.162);
    }
}
