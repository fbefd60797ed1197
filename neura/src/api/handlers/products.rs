//! AI service endpoints.
//!
//! All routes here sit behind [`track_usage`](crate::limits::track_usage), which authenticates the
//! caller and enforces rate and plan limits before the handler runs.

use crate::{
    AppState,
    api::{
        extract::Json,
        models::{
            products::{
                LandingPageRequest, LandingPageResponse, LogoRequest, LogoResponse, NameGeneratorRequest, NameGeneratorResponse,
                ResumeReviewRequest, ResumeReviewResponse, SeoAuditRequest, SeoAuditResponse,
            },
            users::CurrentUser,
        },
    },
    errors::Result,
    products::{landing, logo, names, resume, seo},
};
use axum::extract::State;

#[utoipa::path(
    post,
    path = "/api/resume/review",
    tag = "services",
    summary = "Review a resume",
    request_body = ResumeReviewRequest,
    responses(
        (status = 200, description = "Resume analysis", body = ResumeReviewResponse),
        (status = 400, description = "Empty resume"),
        (status = 401, description = "Not authenticated"),
        (status = 402, description = "No active subscription or monthly limit reached"),
        (status = 429, description = "Rate limited"),
    ),
    security(("bearer" = []))
)]
pub async fn review_resume(_current_user: CurrentUser, Json(request): Json<ResumeReviewRequest>) -> Result<Json<ResumeReviewResponse>> {
    Ok(Json(resume::review(&request)?))
}

#[utoipa::path(
    post,
    path = "/api/landing-page/generate",
    tag = "services",
    summary = "Generate a landing page",
    request_body = LandingPageRequest,
    responses(
        (status = 200, description = "Generated page", body = LandingPageResponse),
        (status = 401, description = "Not authenticated"),
        (status = 402, description = "No active subscription or monthly limit reached"),
        (status = 429, description = "Rate limited"),
    ),
    security(("bearer" = []))
)]
pub async fn generate_landing_page(_current_user: CurrentUser, Json(request): Json<LandingPageRequest>) -> Json<LandingPageResponse> {
    Json(landing::generate(&request))
}

#[utoipa::path(
    post,
    path = "/api/names/generate",
    tag = "services",
    summary = "Suggest business names",
    request_body = NameGeneratorRequest,
    responses(
        (status = 200, description = "Name suggestions", body = NameGeneratorResponse),
        (status = 401, description = "Not authenticated"),
        (status = 402, description = "No active subscription or monthly limit reached"),
        (status = 429, description = "Rate limited"),
    ),
    security(("bearer" = []))
)]
pub async fn generate_names(_current_user: CurrentUser, Json(request): Json<NameGeneratorRequest>) -> Json<NameGeneratorResponse> {
    Json(names::generate(&request))
}

/// Audit a public web page.
///
/// An unreachable page is not an error: the response carries the failure in `audit.error`.
#[utoipa::path(
    post,
    path = "/api/seo/audit",
    tag = "services",
    summary = "Audit a web page",
    request_body = SeoAuditRequest,
    responses(
        (status = 200, description = "Audit report", body = SeoAuditResponse),
        (status = 401, description = "Not authenticated"),
        (status = 402, description = "No active subscription or monthly limit reached"),
        (status = 429, description = "Rate limited"),
    ),
    security(("bearer" = []))
)]
pub async fn audit_website(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(request): Json<SeoAuditRequest>,
) -> Json<SeoAuditResponse> {
    Json(seo::audit(&state.http_client, &request.url, state.config.products.seo_fetch_timeout).await)
}

#[utoipa::path(
    post,
    path = "/api/logo/generate",
    tag = "services",
    summary = "Generate a logo",
    request_body = LogoRequest,
    responses(
        (status = 200, description = "Logo variations", body = LogoResponse),
        (status = 401, description = "Not authenticated"),
        (status = 402, description = "No active subscription or monthly limit reached"),
        (status = 429, description = "Rate limited"),
    ),
    security(("bearer" = []))
)]
pub async fn generate_logo(_current_user: CurrentUser, Json(request): Json<LogoRequest>) -> Json<LogoResponse> {
    Json(logo::generate(&request))
}

#[cfg(test)]
mod tests {
    use crate::{billing::Billing, test_utils::*};
    use serde_json::json;
    use sqlx::SqlitePool;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    /// A user on the free plan and their API key
    async fn subscribed_caller(pool: &SqlitePool, email: &str) -> String {
        let user = create_test_user(pool, email).await;
        let mut conn = pool.acquire().await.unwrap();
        Billing::provision_free_plan(&mut conn, user.id, Duration::from_secs(3600)).await.unwrap();
        create_test_api_key(pool, user.id).await.1
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_resume_review(pool: SqlitePool) {
        let app = create_test_app(pool.clone()).await;
        let key = subscribed_caller(&pool, "resume@example.com").await;

        let response = app
            .post("/api/resume/review")
            .authorization_bearer(&key)
            .json(&json!({ "resume_text": "Rust developer", "job_description": "rust developer wanted" }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["service"], "resume_review");
        assert_eq!(body["analysis"]["overall_score"], json!(7.5));
        assert_eq!(body["analysis"]["job_match"], json!(0.67));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_landing_page(pool: SqlitePool) {
        let app = create_test_app(pool.clone()).await;
        let key = subscribed_caller(&pool, "landing@example.com").await;

        let response = app
            .post("/api/landing-page/generate")
            .authorization_bearer(&key)
            .json(&json!({
                "name": "Green Leaf",
                "industry": "Gardening",
                "target_audience": "Homeowners",
                "benefits": ["Organic", "Local"],
            }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["preview_url"], "https://preview.neura-ai.com/green-leaf");
        assert!(body["html"].as_str().unwrap().contains("Why Choose Green Leaf?"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_names(pool: SqlitePool) {
        let app = create_test_app(pool.clone()).await;
        let key = subscribed_caller(&pool, "names@example.com").await;

        let response = app
            .post("/api/names/generate")
            .authorization_bearer(&key)
            .json(&json!({ "industry": "healthcare", "keywords": ["vital"] }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["names"][0], "ProVital");
        assert_eq!(body["names"][6], "MedTech");
        assert_eq!(body["domain_availability"]["VitalHub"], "vitalhub.com");
        assert_eq!(body["style"], "modern");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_seo_audit(pool: SqlitePool) {
        let app = create_test_app(pool.clone()).await;
        let key = subscribed_caller(&pool, "seo@example.com").await;
        let site = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><title>Tiny</title><h1>Hi</h1></html>"))
            .mount(&site)
            .await;

        let response = app
            .post("/api/seo/audit")
            .authorization_bearer(&key)
            .json(&json!({ "url": format!("{}/", site.uri()) }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["audit"]["title_analysis"]["title"], "Tiny");
        assert_eq!(body["audit"]["headings"]["h1_count"], 1);
        assert_eq!(body["next_audit_recommended"], "30 days");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_logo(pool: SqlitePool) {
        let app = create_test_app(pool.clone()).await;
        let key = subscribed_caller(&pool, "logo@example.com").await;

        let response = app
            .post("/api/logo/generate")
            .authorization_bearer(&key)
            .json(&json!({ "company_name": "Neura", "industry": "education" }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["color_palette"], json!(["#7c3aed", "#6d28d9", "#8b5cf6"]));
        assert!(
            body["logo_variations"][0]["image_data"]
                .as_str()
                .unwrap()
                .starts_with("data:image/svg+xml;base64,")
        );
    }
}
