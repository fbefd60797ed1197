//! Shared fixtures for the in-crate tests.

use std::sync::Arc;

use crate::{
    AppState, Application,
    api::models::users::CurrentUser,
    auth::{password, session},
    config::{Config, DummyConfig, PasswordConfig, PaymentConfig, RateLimitConfig},
    crypto,
    db::{
        handlers::{ApiKeys, Repository, Users},
        models::{
            api_keys::{ApiKeyCreateDBRequest, ApiKeyDBResponse},
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
    payment_providers::dummy::DummyProvider,
    types::UserId,
};
use axum_test::TestServer;
use sqlx::SqlitePool;

/// Password every [`create_test_user`] account is created with
pub const TEST_PASSWORD: &str = "password123";

/// Configuration for tests: cheap Argon2, the dummy payment provider, no rate limiting.
pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        payment: PaymentConfig::Dummy(DummyConfig::default()),
        rate_limit: RateLimitConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };

    config.auth.jwt_secret = "test-secret-key-for-testing-only".to_string();
    config.auth.password = PasswordConfig {
        argon2_memory_kib: 1024,
        argon2_iterations: 1,
        argon2_parallelism: 1,
        ..Default::default()
    };
    config.billing.enforce_usage_limits = true;

    config
}

/// State over `pool` with the test configuration, for exercising extractors directly.
pub fn create_test_state(pool: SqlitePool) -> AppState {
    crate::install_crypto_provider();
    let config = create_test_config();

    AppState::builder()
        .db(pool)
        .payment_provider(Arc::new(DummyProvider::default()))
        .rate_limiter(Arc::new(crate::limits::RateLimiter::new(&config.rate_limit)))
        .config(config)
        .http_client(reqwest::Client::new())
        .build()
}

pub async fn create_test_app(pool: SqlitePool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: SqlitePool, config: Config) -> TestServer {
    crate::install_crypto_provider();

    Application::new_with_pool(config, pool)
        .await
        .expect("Failed to create application")
        .into_test_server()
}

/// Insert an active user with [`TEST_PASSWORD`] and no subscription.
pub async fn create_test_user(pool: &SqlitePool, email: &str) -> UserDBResponse {
    let params = (&create_test_config().auth.password).into();
    let password_hash = password::hash_password(TEST_PASSWORD, params).expect("Failed to hash test password");

    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            password_hash,
        })
        .await
        .expect("Failed to create test user")
}

/// Insert an API key for `user_id`. Returns the stored row and the plaintext key.
pub async fn create_test_api_key(pool: &SqlitePool, user_id: UserId) -> (ApiKeyDBResponse, String) {
    let secret = crypto::generate_api_key(&create_test_config().auth.api_key_prefix);

    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let key = ApiKeys::new(&mut conn)
        .create(&ApiKeyCreateDBRequest {
            user_id,
            name: "Test Key".to_string(),
            key_hash: crypto::hash_api_key(&secret),
            key_prefix: crypto::key_display_prefix(&secret),
            rate_limit: None,
        })
        .await
        .expect("Failed to create test API key");

    (key, secret)
}

/// The caller as a session-token request from `user` would resolve it.
pub fn current_user_for(user: &UserDBResponse) -> CurrentUser {
    CurrentUser {
        id: user.id,
        email: user.email.clone(),
        plan: user.plan.clone(),
        api_key: None,
    }
}

/// A session token for `user`, signed with the test configuration's secret.
pub fn session_token_for(user: &UserDBResponse) -> String {
    session::create_session_token(user.id, &user.email, &create_test_config().auth).expect("Failed to sign test session token")
}
