//! API key issuance, listing and revocation for the authenticated caller.

use crate::{
    AppState,
    api::{
        extract::Query,
        models::{
            api_keys::{ApiKeyCreateQuery, ApiKeyCreatedResponse, ApiKeyResponse, ApiKeyRevokedResponse},
            users::CurrentUser,
        },
    },
    config::AuthConfig,
    crypto,
    db::{
        errors::DbError,
        handlers::{ApiKeys, Repository, api_keys::ApiKeyFilter},
        models::api_keys::{ApiKeyCreateDBRequest, ApiKeyDBResponse},
    },
    errors::{Error, Result},
    types::{ApiKeyId, UserId},
    utils::truncate_string,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use sqlx::SqliteConnection;
use tracing::info;

const MAX_KEY_NAME_CHARS: usize = 100;

/// Generate a key for `user_id` and store its hash. Returns the stored row and the plaintext key.
pub(crate) async fn issue_api_key(
    conn: &mut SqliteConnection,
    user_id: UserId,
    name: &str,
    config: &AuthConfig,
) -> Result<(ApiKeyDBResponse, String)> {
    let key = crypto::generate_api_key(&config.api_key_prefix);

    let stored = ApiKeys::new(conn)
        .create(&ApiKeyCreateDBRequest {
            user_id,
            name: name.to_string(),
            key_hash: crypto::hash_api_key(&key),
            key_prefix: crypto::key_display_prefix(&key),
            rate_limit: None,
        })
        .await?;

    Ok((stored, key))
}

/// Create an API key for the caller.
///
/// This is the only response that ever contains the key itself.
#[utoipa::path(
    post,
    path = "/auth/api-key",
    tag = "auth",
    summary = "Create API key",
    params(ApiKeyCreateQuery),
    responses(
        (status = 201, description = "API key created", body = ApiKeyCreatedResponse),
        (status = 400, description = "Invalid key name"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer" = []))
)]
pub async fn create_api_key(
    State(state): State<AppState>,
    Query(query): Query<ApiKeyCreateQuery>,
    current_user: CurrentUser,
) -> Result<(StatusCode, Json<ApiKeyCreatedResponse>)> {
    let name = query.name.trim();
    if name.is_empty() {
        return Err(Error::bad_request("API key name cannot be empty"));
    }
    let name = truncate_string(name, MAX_KEY_NAME_CHARS, "...");

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let (stored, api_key) = issue_api_key(&mut conn, current_user.id, &name, &state.config.auth).await?;
    info!(user_id = current_user.id, key_id = stored.id, "API key created");

    Ok((
        StatusCode::CREATED,
        Json(ApiKeyCreatedResponse {
            api_key,
            key_id: stored.id,
            prefix: stored.key_prefix,
            name: stored.name,
            created_at: stored.created_at,
        }),
    ))
}

/// List the caller's API keys, newest first. Secrets are never included.
#[utoipa::path(
    get,
    path = "/auth/api-keys",
    tag = "auth",
    summary = "List API keys",
    responses(
        (status = 200, description = "The caller's API keys", body = [ApiKeyResponse]),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer" = []))
)]
pub async fn list_api_keys(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<Vec<ApiKeyResponse>>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let keys = ApiKeys::new(&mut conn).list(&ApiKeyFilter::for_user(current_user.id)).await?;

    Ok(Json(keys.into_iter().map(ApiKeyResponse::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/auth/api-keys/{key_id}",
    tag = "auth",
    summary = "Revoke API key",
    params(("key_id" = i64, Path, description = "API key ID")),
    responses(
        (status = 200, description = "API key revoked", body = ApiKeyRevokedResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No active key with this ID belongs to the caller"),
    ),
    security(("bearer" = []))
)]
pub async fn revoke_api_key(
    State(state): State<AppState>,
    Path(key_id): Path<ApiKeyId>,
    current_user: CurrentUser,
) -> Result<Json<ApiKeyRevokedResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    if !ApiKeys::new(&mut conn).deactivate_for_user(key_id, current_user.id).await? {
        return Err(Error::not_found("API key not found"));
    }
    info!(user_id = current_user.id, key_id, "API key revoked");

    Ok(Json(ApiKeyRevokedResponse {
        message: "API key revoked".to_string(),
        key_id,
    }))
}
