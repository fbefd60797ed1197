//! # neura: AI SaaS Factory
//!
//! `neura` serves a small catalogue of AI services (resume review, landing pages, business
//! names, SEO audits and logos) behind API-key authentication, subscription plans and monthly
//! usage limits.
//!
//! ## Overview
//!
//! Users register with an email and password and receive an initial API key and a free plan.
//! They can then call the services at `/api/*` with either the API key or a session token from
//! `/auth/login`. Every service call is rate limited per caller, checked against the caller's
//! plan quota, counted against the current billing month and recorded for analytics.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses SQLite through sqlx for persistence.
//!
//! ### Request Flow
//!
//! Requests to the services (`/api/*`) pass through [`limits::track_usage`], which authenticates
//! the caller, applies the per-caller rate limit and the plan quota, runs the handler, and then
//! records the call. All other authenticated routes resolve the caller with the
//! [`CurrentUser`](api::models::users::CurrentUser) extractor only.
//!
//! ### Core Components
//!
//! - **API layer** ([`api`]): handlers and request/response models
//! - **Authentication** ([`auth`]): password hashing, session tokens and the caller extractor
//! - **Billing** ([`billing`]): plans, subscriptions, quotas and one-time payments, backed by a
//!   pluggable payment provider
//! - **Services** ([`products`]): the AI service implementations
//! - **Database layer** ([`db`]): repositories over SQLite
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use neura::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     neura::install_crypto_provider();
//!
//!     let args = neura::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     neura::telemetry::init_telemetry(config.enable_otel_export, &config.environment)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod billing;
pub mod config;
pub mod crypto;
pub mod db;
pub mod errors;
pub mod limits;
mod openapi;
mod payment_providers;
pub mod products;
pub mod telemetry;
mod types;
pub mod utils;

#[cfg(test)]
pub mod test_utils;

use crate::{
    api::handlers::{analytics, api_keys, auth as auth_handlers, billing as billing_handlers, products as product_handlers, system, ws},
    config::CorsOrigin,
    limits::RateLimiter,
    openapi::ApiDoc,
    payment_providers::PaymentProvider,
};
use axum::{
    Json, Router,
    http::{self, HeaderValue},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use api::handlers::ws::ConnectionHub;
pub use types::{ApiKeyId, PaymentId, SubscriptionId, UserId};

/// Application state shared across all request handlers.
///
/// # Fields
///
/// - `db`: SQLite connection pool
/// - `config`: Application configuration loaded from file and environment
/// - `payment_provider`: Charges subscriptions and one-time purchases
/// - `rate_limiter`: Per-caller token buckets for the service endpoints
/// - `ws_hub`: Open WebSocket connections, for broadcast
/// - `http_client`: Outbound client used by the SEO audit
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .payment_provider(provider)
///     .http_client(client)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub payment_provider: Arc<dyn PaymentProvider>,
    #[builder(default)]
    pub rate_limiter: Arc<RateLimiter>,
    #[builder(default)]
    pub ws_hub: Arc<ConnectionHub>,
    pub http_client: reqwest::Client,
}

/// Install the process-wide rustls crypto provider. Safe to call more than once.
///
/// reqwest is built without a bundled provider, so this must run before any client is created.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Get the neura database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    // tower-http refuses `*` inside an origin list
    let allow_origin = if config.cors.allowed_origins.contains(&CorsOrigin::Wildcard) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::DELETE, http::Method::OPTIONS])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// - System routes (`/`, `/health`, `/dashboard`)
/// - Auth, billing and analytics routes, authenticated per handler
/// - Service routes (`/api/*`), wrapped in [`limits::track_usage`]
/// - WebSocket broadcast at `/ws/{client_id}`
/// - OpenAPI JSON at `/openapi.json` and Scalar docs at `/docs`
/// - CORS, body size limit and tracing
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = create_cors_layer(&state.config)?;
    let max_request_body = state.config.limits.max_request_body;

    let services = Router::new()
        .route("/api/resume/review", post(product_handlers::review_resume))
        .route("/api/landing-page/generate", post(product_handlers::generate_landing_page))
        .route("/api/names/generate", post(product_handlers::generate_names))
        .route("/api/seo/audit", post(product_handlers::audit_website))
        .route("/api/logo/generate", post(product_handlers::generate_logo))
        .route_layer(from_fn_with_state(state.clone(), limits::track_usage));

    let router = Router::new()
        // System
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/dashboard", get(system::dashboard))
        // Auth
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/api-key", post(api_keys::create_api_key))
        .route("/auth/api-keys", get(api_keys::list_api_keys))
        .route("/auth/api-keys/{key_id}", delete(api_keys::revoke_api_key))
        // Billing
        .route("/billing/plans", get(billing_handlers::get_plans))
        .route("/billing/services", get(billing_handlers::get_services))
        .route("/billing/subscribe", post(billing_handlers::subscribe))
        .route("/billing/subscription", get(billing_handlers::get_subscription))
        .route("/billing/cancel", post(billing_handlers::cancel_subscription))
        .route("/billing/usage", get(billing_handlers::get_usage))
        .route("/billing/history", get(billing_handlers::get_history))
        .route("/billing/payments", post(billing_handlers::create_payment))
        // Analytics
        .route("/analytics/dashboard", get(analytics::dashboard))
        // Realtime
        .route("/ws/{client_id}", get(ws::websocket))
        .merge(services)
        .with_state(state)
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let router = router
        .layer(RequestBodyLimitLayer::new(max_request_body))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// Main application struct that owns all resources.
///
/// 1. **Create**: [`Application::new`] opens the database, runs migrations and builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal resolves, in-flight requests drain and the pool closes
pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting neura with configuration: {:#?}", config);

        let pool = utils::retry_async(3, std::time::Duration::from_secs(1), || db::connect(&config.database))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open database {}: {}", config.database.url, e))?;

        Self::new_with_pool(config, pool).await
    }

    /// Create an application over an existing pool. Migrations are applied first.
    pub async fn new_with_pool(config: Config, pool: SqlitePool) -> anyhow::Result<Self> {
        migrator().run(&pool).await?;
        info!("Database migrations applied");

        let http_client = reqwest::Client::builder().build()?;
        let payment_provider: Arc<dyn PaymentProvider> = Arc::from(payment_providers::create_provider(config.payment.clone())?);

        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .payment_provider(payment_provider)
            .rate_limiter(Arc::new(RateLimiter::new(&config.rate_limit)))
            .http_client(http_client)
            .build();

        let router = build_router(app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("neura listening on http://{}, docs at http://localhost:{}/docs", bind_addr, self.config.port);

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
