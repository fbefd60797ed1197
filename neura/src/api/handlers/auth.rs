//! Registration and login.

use crate::{
    AppState,
    api::{
        extract::Json,
        handlers::api_keys::issue_api_key,
        models::users::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
    },
    auth::{
        password::{self, Argon2Params},
        session,
    },
    billing::Billing,
    db::{
        errors::DbError,
        handlers::{Repository, Users},
        models::users::UserCreateDBRequest,
    },
    errors::{Error, Result},
    utils::validate_email,
};
use axum::{extract::State, http::StatusCode};
use tracing::{info, instrument};

const INITIAL_KEY_NAME: &str = "Initial Key";

/// Register a new user.
///
/// The user is created together with an initial API key and a free plan subscription, so the
/// returned key can call the services straight away.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    summary = "Register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Invalid email or password, or email already registered"),
    )
)]
#[instrument(skip_all, err)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let email = request.email.trim().to_string();
    if !validate_email(&email) {
        return Err(Error::bad_request("Invalid email format"));
    }
    password::validate_password(&request.password, &state.config.auth.password)?;

    let password_hash = password::hash_password_blocking(request.password, Argon2Params::from(&state.config.auth.password)).await?;

    let mut tx = state.db.begin().await.map_err(DbError::from)?;

    let user = Users::new(&mut tx)
        .create(&UserCreateDBRequest { email, password_hash })
        .await
        .map_err(|e| match e {
            DbError::UniqueViolation { .. } => Error::bad_request("Email already registered"),
            e => Error::Database(e),
        })?;
    let (_, api_key) = issue_api_key(&mut tx, user.id, INITIAL_KEY_NAME, &state.config.auth).await?;
    Billing::provision_free_plan(&mut tx, user.id, state.config.billing.billing_period).await?;

    tx.commit().await.map_err(DbError::from)?;
    info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user_id: user.id,
            email: user.email,
            api_key,
            created_at: user.created_at,
        }),
    ))
}

/// Exchange email and password for a session token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    summary = "Login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token issued", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
    )
)]
#[instrument(skip_all, err)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<LoginResponse>> {
    let invalid = || Error::unauthenticated("Invalid email or password");

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let user = Users::new(&mut conn)
        .get_user_by_email(request.email.trim())
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(invalid)?;
    drop(conn);

    if !password::verify_password_blocking(request.password, user.password_hash.clone()).await? {
        return Err(invalid());
    }

    let access_token = session::create_session_token(user.id, &user.email, &state.config.auth)?;
    info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: state.config.auth.jwt_expiry.as_secs(),
    }))
}
