//! OpenAPI document for the public API, served as JSON at `/openapi.json` and rendered with
//! Scalar at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api::{handlers, models};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "bearer".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Either an API key or a session token from `/auth/login`:\n\n\
                            ```\nAuthorization: Bearer neura_...\n```\n\n\
                            Every account gets an initial API key at registration.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "NEURA AI SaaS Factory",
        description = "AI services behind API-key authentication, subscription plans and usage limits."
    ),
    modifiers(&SecurityAddon),
    paths(
        handlers::system::root,
        handlers::system::health,
        handlers::auth::register,
        handlers::auth::login,
        handlers::api_keys::create_api_key,
        handlers::api_keys::list_api_keys,
        handlers::api_keys::revoke_api_key,
        handlers::billing::get_plans,
        handlers::billing::get_services,
        handlers::billing::subscribe,
        handlers::billing::get_subscription,
        handlers::billing::cancel_subscription,
        handlers::billing::get_usage,
        handlers::billing::get_history,
        handlers::billing::create_payment,
        handlers::products::review_resume,
        handlers::products::generate_landing_page,
        handlers::products::generate_names,
        handlers::products::audit_website,
        handlers::products::generate_logo,
        handlers::analytics::dashboard,
    ),
    components(
        schemas(
            models::users::RegisterRequest,
            models::users::RegisterResponse,
            models::users::LoginRequest,
            models::users::LoginResponse,
            models::api_keys::ApiKeyCreatedResponse,
            models::api_keys::ApiKeyResponse,
            models::api_keys::ApiKeyRevokedResponse,
            models::billing::PlanDetails,
            models::billing::PlansResponse,
            models::billing::ServicesResponse,
            models::billing::SubscribeRequest,
            models::billing::SubscriptionCreatedResponse,
            models::billing::SubscriptionInfo,
            models::billing::SubscriptionResponse,
            models::billing::CancelSubscriptionResponse,
            models::billing::UsageLimits,
            models::billing::UsageStatistics,
            models::billing::UsageResponse,
            models::billing::BillingHistoryItem,
            models::billing::BillingHistoryResponse,
            models::billing::PaymentRequest,
            models::billing::PaymentResponse,
            models::billing::AnalyticsResponse,
            models::products::ResumeReviewRequest,
            models::products::ResumeReviewResponse,
            models::products::ResumeAnalysis,
            models::products::LandingPageRequest,
            models::products::LandingPageResponse,
            models::products::NameGeneratorRequest,
            models::products::NameGeneratorResponse,
            models::products::SeoAuditRequest,
            models::products::SeoAuditResponse,
            models::products::SeoAudit,
            models::products::SeoReport,
            models::products::LogoRequest,
            models::products::LogoResponse,
            models::products::LogoVariation,
            models::system::ServiceInfo,
            models::system::HealthResponse,
            models::system::ComponentHealth,
        )
    ),
    tags(
        (name = "system", description = "Service information and health"),
        (name = "auth", description = "Registration, login and API keys"),
        (name = "billing", description = "Plans, subscriptions, usage and payments"),
        (name = "services", description = "The AI services. Each call counts against the monthly plan quota."),
        (name = "analytics", description = "Dashboard data for the authenticated user"),
    )
)]
pub struct ApiDoc;
