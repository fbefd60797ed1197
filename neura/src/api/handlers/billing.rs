//! Plans, subscriptions, usage and one-time payments.

use crate::{
    AppState,
    api::{
        extract::Json,
        models::{
            billing::{
                BillingHistoryResponse, CancelSubscriptionResponse, PaymentRequest, PaymentResponse, PlanCatalog, PlansResponse,
                ServiceCatalog, ServicesResponse, SubscribeRequest, SubscriptionCreatedResponse, SubscriptionResponse, UsageResponse,
            },
            users::CurrentUser,
        },
    },
    billing::Billing,
    errors::Result,
};
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/billing/plans",
    tag = "billing",
    summary = "List plans",
    responses((status = 200, description = "Every plan keyed by plan id", body = PlansResponse))
)]
pub async fn get_plans() -> Json<PlansResponse> {
    Json(PlansResponse { plans: PlanCatalog })
}

#[utoipa::path(
    get,
    path = "/billing/services",
    tag = "billing",
    summary = "List one-time service prices",
    responses((status = 200, description = "Every service price keyed by service id", body = ServicesResponse))
)]
pub async fn get_services() -> Json<ServicesResponse> {
    Json(ServicesResponse { services: ServiceCatalog })
}

/// Subscribe to a plan, replacing any active subscription.
#[utoipa::path(
    post,
    path = "/billing/subscribe",
    tag = "billing",
    summary = "Subscribe",
    request_body = SubscribeRequest,
    responses(
        (status = 200, description = "Subscription created", body = SubscriptionCreatedResponse),
        (status = 400, description = "Invalid plan, missing payment method or payment failed"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer" = []))
)]
pub async fn subscribe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<SubscriptionCreatedResponse>> {
    let created = Billing::from_state(&state)
        .create_subscription(&current_user, &request.plan_id, request.payment_method_id.as_deref())
        .await?;
    Ok(Json(created))
}

#[utoipa::path(
    get,
    path = "/billing/subscription",
    tag = "billing",
    summary = "Current subscription",
    responses(
        (status = 200, description = "The active subscription, or a message when there is none", body = SubscriptionResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer" = []))
)]
pub async fn get_subscription(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<SubscriptionResponse>> {
    let response = match Billing::from_state(&state).get_user_subscription(current_user.id).await? {
        Some(info) => SubscriptionResponse::Active(info),
        None => SubscriptionResponse::None {
            message: "No active subscription".to_string(),
        },
    };
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/billing/cancel",
    tag = "billing",
    summary = "Cancel subscription",
    responses(
        (status = 200, description = "Subscription cancelled, user moved to the free plan", body = CancelSubscriptionResponse),
        (status = 400, description = "The payment provider refused the cancellation"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No active subscription"),
    ),
    security(("bearer" = []))
)]
pub async fn cancel_subscription(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<CancelSubscriptionResponse>> {
    Ok(Json(Billing::from_state(&state).cancel_subscription(current_user.id).await?))
}

/// This month's quota position merged with lifetime API-key statistics
#[utoipa::path(
    get,
    path = "/billing/usage",
    tag = "billing",
    summary = "Usage",
    responses(
        (status = 200, description = "Usage limits and statistics", body = UsageResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer" = []))
)]
pub async fn get_usage(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UsageResponse>> {
    let billing = Billing::from_state(&state);

    Ok(Json(UsageResponse {
        limits: billing.check_usage_limits(current_user.id).await?,
        statistics: billing.get_user_usage(current_user.id).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/billing/history",
    tag = "billing",
    summary = "Billing history",
    responses(
        (status = 200, description = "Payments, newest first", body = BillingHistoryResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer" = []))
)]
pub async fn get_history(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<BillingHistoryResponse>> {
    let history = Billing::from_state(&state).get_billing_history(current_user.id).await?;
    Ok(Json(BillingHistoryResponse { history }))
}

/// Pay for a one-time service
#[utoipa::path(
    post,
    path = "/billing/payments",
    tag = "billing",
    summary = "Purchase a service",
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Payment recorded", body = PaymentResponse),
        (status = 400, description = "Invalid service or payment failed"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer" = []))
)]
pub async fn create_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<PaymentResponse>> {
    let payment = Billing::from_state(&state)
        .process_payment(&current_user, &request.service_id, &request.payment_method_id)
        .await?;
    Ok(Json(payment))
}
