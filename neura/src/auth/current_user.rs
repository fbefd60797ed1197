use crate::{
    AppState,
    api::models::users::{ApiKeyContext, CurrentUser},
    auth::session,
    crypto,
    db::handlers::{ApiKeys, Repository, Users},
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::{debug, instrument, trace};

/// Pull the bearer token out of the `Authorization` header.
///
/// A missing header, a non-UTF-8 value, another scheme or an empty token are all "Not authenticated".
fn bearer_token(parts: &Parts) -> Result<&str> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(Error::Unauthenticated { message: None })?;

    match value.strip_prefix("Bearer ").map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(Error::Unauthenticated { message: None }),
    }
}

#[instrument(skip(token, state), err)]
async fn api_key_auth(token: &str, state: &AppState) -> Result<CurrentUser> {
    let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;

    let owner = ApiKeys::new(&mut conn)
        .authenticate(&crypto::hash_api_key(token))
        .await?
        .ok_or_else(|| Error::unauthenticated("Invalid API key"))?;

    Ok(CurrentUser {
        id: owner.user_id,
        email: owner.email,
        plan: owner.plan,
        api_key: Some(ApiKeyContext {
            id: owner.api_key_id,
            usage_count: owner.usage_count,
            rate_limit: owner.rate_limit,
        }),
    })
}

#[instrument(skip(token, state), err)]
async fn session_auth(token: &str, state: &AppState) -> Result<CurrentUser> {
    let claims = session::verify_session_token(token, &state.config.auth)?;

    let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;
    let user = Users::new(&mut conn)
        .get_by_id(claims.user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| Error::unauthenticated("Invalid token"))?;

    Ok(CurrentUser {
        id: user.id,
        email: user.email,
        plan: user.plan,
        api_key: None,
    })
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Already resolved by the usage-tracking middleware
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            trace!("Using authenticated user from request extensions");
            return Ok(user.clone());
        }

        let token = bearer_token(parts)?;

        let user = if token.starts_with(&state.config.auth.api_key_prefix) {
            api_key_auth(token, state).await?
        } else {
            session_auth(token, state).await?
        };

        debug!(user_id = user.id, via_api_key = user.api_key.is_some(), "Authenticated request");
        Ok(user)
    }
}
