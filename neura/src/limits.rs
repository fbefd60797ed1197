//! Per-caller rate limiting and monthly usage enforcement for the service endpoints.
//!
//! [`track_usage`] wraps every `/api/*` route. It authenticates the caller, applies the rate
//! limit, reserves one request of the plan quota (refusing the call once it is used up), and
//! records the call afterwards. The reservation is given back if the call does not succeed.

use std::{num::NonZeroU32, sync::Arc, time::Instant};

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    Quota, RateLimiter as GovernorRateLimiter,
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::{
    AppState,
    api::models::users::CurrentUser,
    billing::{Billing, UsageReservation},
    config::RateLimitConfig,
    db::{
        errors::DbError,
        handlers::{ApiKeys, ApiUsage},
        models::api_usage::ApiUsageCreateDBRequest,
    },
    errors::Error,
    types::ApiKeyId,
};

type DirectLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Per-caller rate limiter. Each API key (or session user) gets its own token bucket.
#[derive(Default)]
pub struct RateLimiter {
    limiters: DashMap<String, Arc<DirectLimiter>>,
    /// `None` when rate limiting is disabled
    quota: Option<Quota>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let quota = if config.enabled {
            NonZeroU32::new(config.requests_per_minute).map(|rpm| {
                let burst = config.burst.and_then(NonZeroU32::new).unwrap_or(rpm);
                Quota::per_minute(rpm).allow_burst(burst)
            })
        } else {
            None
        };

        Self {
            limiters: DashMap::new(),
            quota,
        }
    }

    /// Get or create the limiter for a caller
    fn limiter_for(&self, key: &str, quota: Quota) -> Arc<DirectLimiter> {
        self.limiters
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(GovernorRateLimiter::direct(quota)))
            .clone()
    }

    /// Take one request from the caller's bucket
    pub fn check(&self, key: &str) -> Result<(), RateLimitError> {
        let Some(quota) = self.quota else {
            return Ok(());
        };

        match self.limiter_for(key, quota).check() {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let retry_after = not_until.wait_time_from(DefaultClock::default().now()).as_secs();
                debug!(key, retry_after, "Rate limit exceeded");
                Err(RateLimitError::Exceeded { retry_after })
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded, retry after {retry_after} seconds")]
    Exceeded { retry_after: u64 },
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        match self {
            RateLimitError::Exceeded { retry_after } => {
                let retry_after = retry_after.max(1);
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "error": "rate_limited",
                        "message": format!("Rate limit exceeded. Retry after {retry_after} seconds"),
                    })),
                )
                    .into_response();

                response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                response
            }
        }
    }
}

/// Middleware for the service endpoints.
///
/// The resolved [`CurrentUser`] is left in the request extensions for the handler's extractor.
/// Usage is only counted against the monthly quota for successful responses; API-key callers
/// get an `api_usage` row for every response.
pub async fn track_usage(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, Response> {
    let (mut parts, body) = request.into_parts();
    let user = CurrentUser::from_request_parts(&mut parts, &state)
        .await
        .map_err(IntoResponse::into_response)?;

    state
        .rate_limiter
        .check(&user.rate_limit_key())
        .map_err(IntoResponse::into_response)?;

    let billing = Billing::from_state(&state);
    let reserved_month = if state.config.billing.enforce_usage_limits {
        match billing.reserve_usage(user.id).await.map_err(IntoResponse::into_response)? {
            UsageReservation::Reserved { month } => Some(month),
            UsageReservation::Denied { reason } => return Err(Error::PaymentRequired { message: reason }.into_response()),
        }
    } else {
        None
    };

    let endpoint = parts.uri.path().to_string();
    parts.extensions.insert(user.clone());

    let started = Instant::now();
    let response = next.run(Request::from_parts(parts, body)).await;
    let response_time = started.elapsed().as_secs_f64();
    let status = response.status();

    let counted = match (&reserved_month, status.is_success()) {
        (Some(_), true) | (None, false) => Ok(()),
        (Some(month), false) => billing.release_usage(user.id, month).await,
        (None, true) => billing.increment_usage(user.id).await.map(|_| ()),
    };
    if let Err(e) = counted {
        warn!(user_id = user.id, "Failed to count monthly usage: {}", e);
    }

    if let Some(api_key) = &user.api_key
        && let Err(e) = record_api_usage(&state.db, api_key.id, endpoint, response_time, status).await
    {
        warn!(api_key_id = api_key.id, "Failed to record API usage: {}", e);
    }

    Ok(response)
}

async fn record_api_usage(
    db: &SqlitePool,
    api_key_id: ApiKeyId,
    endpoint: String,
    response_time: f64,
    status: StatusCode,
) -> Result<(), DbError> {
    let mut tx = db.begin().await?;

    ApiUsage::new(&mut tx)
        .record(&ApiUsageCreateDBRequest {
            api_key_id,
            endpoint,
            response_time,
            status_code: i64::from(status.as_u16()),
        })
        .await?;
    ApiKeys::new(&mut tx).record_use(api_key_id).await?;

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::handlers::{MonthlyUsage, Repository},
        test_utils::{create_test_api_key, create_test_app_with_config, create_test_config, create_test_user},
        types::billing_month,
    };
    use axum::body::to_bytes;
    use sqlx::SqlitePool;

    fn config(requests_per_minute: u32, burst: Option<u32>) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            requests_per_minute,
            burst,
        }
    }

    #[test]
    fn test_burst_then_denied() {
        let limiter = RateLimiter::new(&config(60, Some(3)));

        for _ in 0..3 {
            assert!(limiter.check("key:1").is_ok());
        }
        let Err(RateLimitError::Exceeded { retry_after }) = limiter.check("key:1") else {
            panic!("expected the fourth request to be limited");
        };
        assert!(retry_after <= 1);
    }

    #[test]
    fn test_callers_are_limited_independently() {
        let limiter = RateLimiter::new(&config(1, None));

        assert!(limiter.check("key:1").is_ok());
        assert!(limiter.check("key:1").is_err());
        assert!(limiter.check("key:2").is_ok());
        assert!(limiter.check("user:1").is_ok());
    }

    #[test]
    fn test_disabled_never_limits() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: false,
            ..config(1, Some(1))
        });
        for _ in 0..100 {
            assert!(limiter.check("key:1").is_ok());
        }
        assert!(RateLimiter::default().check("key:1").is_ok());
    }

    #[tokio::test]
    async fn test_rate_limited_response_shape() {
        let response = RateLimitError::Exceeded { retry_after: 0 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "1");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "rate_limited");
        assert_eq!(body["message"], "Rate limit exceeded. Retry after 1 seconds");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_service_call_is_tracked(pool: SqlitePool) {
        let server = create_test_app_with_config(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, "tracked@example.com").await;
        let (key, secret) = create_test_api_key(&pool, user.id).await;
        Billing::provision_free_plan(&mut *pool.acquire().await.unwrap(), user.id, std::time::Duration::from_secs(3600))
            .await
            .unwrap();

        let response = server
            .post("/api/names/generate")
            .authorization_bearer(&secret)
            .json(&json!({ "industry": "technology", "keywords": ["cloud"] }))
            .await;
        response.assert_status_ok();

        let mut conn = pool.acquire().await.unwrap();
        let month = billing_month(chrono::Utc::now());
        assert_eq!(MonthlyUsage::new(&mut conn).requests_for(user.id, &month).await.unwrap(), 1);

        let stats = ApiUsage::new(&mut conn).stats_for_user(user.id).await.unwrap();
        assert_eq!(stats.total_requests, 1);
        let key = ApiKeys::new(&mut conn).get_by_id(key.id).await.unwrap().unwrap();
        assert_eq!(key.usage_count, 1);
        assert!(key.last_used.is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_failed_call_is_not_counted(pool: SqlitePool) {
        let server = create_test_app_with_config(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, "failing@example.com").await;
        let (_, secret) = create_test_api_key(&pool, user.id).await;
        Billing::provision_free_plan(&mut *pool.acquire().await.unwrap(), user.id, std::time::Duration::from_secs(3600))
            .await
            .unwrap();

        server
            .post("/api/resume/review")
            .authorization_bearer(&secret)
            .json(&json!({ "resume_text": "" }))
            .await
            .assert_status_bad_request();

        let mut conn = pool.acquire().await.unwrap();
        let month = billing_month(chrono::Utc::now());
        assert_eq!(MonthlyUsage::new(&mut conn).requests_for(user.id, &month).await.unwrap(), 0);
        // The failed call is still logged against the key
        assert_eq!(ApiUsage::new(&mut conn).stats_for_user(user.id).await.unwrap().total_requests, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_no_subscription_is_payment_required(pool: SqlitePool) {
        let server = create_test_app_with_config(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, "unsubscribed@example.com").await;
        let (_, secret) = create_test_api_key(&pool, user.id).await;

        let response = server
            .post("/api/names/generate")
            .authorization_bearer(&secret)
            .json(&json!({ "industry": "technology", "keywords": ["cloud"] }))
            .await;
        response.assert_status(StatusCode::PAYMENT_REQUIRED);
        response.assert_json(&json!({ "detail": "No active subscription" }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_quota_exhausted_is_payment_required(pool: SqlitePool) {
        let server = create_test_app_with_config(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, "quota@example.com").await;
        let (_, secret) = create_test_api_key(&pool, user.id).await;
        Billing::provision_free_plan(&mut *pool.acquire().await.unwrap(), user.id, std::time::Duration::from_secs(3600))
            .await
            .unwrap();

        let month = billing_month(chrono::Utc::now());
        let mut conn = pool.acquire().await.unwrap();
        for _ in 0..100 {
            MonthlyUsage::new(&mut conn).increment(user.id, &month).await.unwrap();
        }

        let response = server
            .post("/api/names/generate")
            .authorization_bearer(&secret)
            .json(&json!({ "industry": "technology", "keywords": ["cloud"] }))
            .await;
        response.assert_status(StatusCode::PAYMENT_REQUIRED);
        response.assert_json(&json!({ "detail": "Monthly request limit exceeded" }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_concurrent_calls_cannot_overrun_quota(pool: SqlitePool) {
        let server = create_test_app_with_config(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, "racing@example.com").await;
        let (_, secret) = create_test_api_key(&pool, user.id).await;
        Billing::provision_free_plan(&mut *pool.acquire().await.unwrap(), user.id, std::time::Duration::from_secs(3600))
            .await
            .unwrap();

        let month = billing_month(chrono::Utc::now());
        {
            let mut conn = pool.acquire().await.unwrap();
            for _ in 0..99 {
                MonthlyUsage::new(&mut conn).increment(user.id, &month).await.unwrap();
            }
        }

        let body = json!({ "industry": "technology", "keywords": ["cloud"] });
        let calls = (0..10).map(|_| {
            server
                .post("/api/names/generate")
                .authorization_bearer(&secret)
                .json(&body)
                .into_future()
        });
        let responses = futures::future::join_all(calls).await;

        let ok = responses.iter().filter(|r| r.status_code() == StatusCode::OK).count();
        let refused = responses.iter().filter(|r| r.status_code() == StatusCode::PAYMENT_REQUIRED).count();
        assert_eq!((ok, refused), (1, 9));

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(MonthlyUsage::new(&mut conn).requests_for(user.id, &month).await.unwrap(), 100);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_enforcement_can_be_disabled(pool: SqlitePool) {
        let mut config = create_test_config();
        config.billing.enforce_usage_limits = false;
        let server = create_test_app_with_config(pool.clone(), config).await;
        let user = create_test_user(&pool, "unenforced@example.com").await;
        let (_, secret) = create_test_api_key(&pool, user.id).await;

        server
            .post("/api/names/generate")
            .authorization_bearer(&secret)
            .json(&json!({ "industry": "technology", "keywords": ["cloud"] }))
            .await
            .assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_rate_limit_applies_to_service_calls(pool: SqlitePool) {
        let mut config = create_test_config();
        config.billing.enforce_usage_limits = false;
        config.rate_limit = RateLimitConfig {
            enabled: true,
            requests_per_minute: 1,
            burst: None,
        };
        let server = create_test_app_with_config(pool.clone(), config).await;
        let user = create_test_user(&pool, "limited@example.com").await;
        let (_, secret) = create_test_api_key(&pool, user.id).await;
        let body = json!({ "industry": "finance", "keywords": ["ledger"] });

        server
            .post("/api/names/generate")
            .authorization_bearer(&secret)
            .json(&body)
            .await
            .assert_status_ok();

        let response = server.post("/api/names/generate").authorization_bearer(&secret).json(&body).await;
        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().get(header::RETRY_AFTER).is_some());
        assert_eq!(response.json::<serde_json::Value>()["error"], "rate_limited");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unauthenticated_service_call(pool: SqlitePool) {
        let server = create_test_app_with_config(pool.clone(), create_test_config()).await;

        let response = server
            .post("/api/names/generate")
            .json(&json!({ "industry": "technology", "keywords": ["cloud"] }))
            .await;
        response.assert_status_unauthorized();
        response.assert_json(&json!({ "detail": "Not authenticated" }));
    }
}
