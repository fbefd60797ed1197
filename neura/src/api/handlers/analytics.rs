use crate::{
    AppState,
    api::models::{billing::AnalyticsResponse, users::CurrentUser},
    billing::Billing,
    errors::Result,
};
use axum::{extract::State, response::Json};
use chrono::Utc;

/// Usage, subscription and payments in one response for the dashboard
#[utoipa::path(
    get,
    path = "/analytics/dashboard",
    tag = "analytics",
    summary = "Dashboard data",
    responses(
        (status = 200, description = "Usage statistics, subscription and billing history", body = AnalyticsResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer" = []))
)]
pub async fn dashboard(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<AnalyticsResponse>> {
    let billing = Billing::from_state(&state);

    Ok(Json(AnalyticsResponse {
        usage: billing.get_user_usage(current_user.id).await?,
        subscription: billing.get_user_subscription(current_user.id).await?,
        billing_history: billing.get_billing_history(current_user.id).await?,
        timestamp: Utc::now(),
    }))
}
