//! JWT session token creation and verification.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{config::AuthConfig, errors::Error, types::UserId};

/// JWT session claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: UserId,
    pub email: String,
    pub exp: i64, // Expiration time
    pub iat: i64, // Issued at
}

impl SessionClaims {
    pub fn new(user_id: UserId, email: &str, config: &AuthConfig) -> Self {
        let now = Utc::now();
        let exp = now + config.jwt_expiry;

        Self {
            user_id,
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Create an HS256 session token for a user
pub fn create_session_token(user_id: UserId, email: &str, config: &AuthConfig) -> Result<String, Error> {
    let claims = SessionClaims::new(user_id, email, config);
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create JWT: {e}"),
    })
}

/// Verify and decode a session token.
///
/// Anything wrong with the token itself is the caller's fault and yields 401 "Invalid token";
/// key and crypto failures are ours.
pub fn verify_session_token(token: &str, config: &AuthConfig) -> Result<SessionClaims, Error> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::InvalidEcdsaKey
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::RsaFailedSigning
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::Crypto(_) => Error::Internal {
            operation: format!("JWT verification: {e}"),
        },
        // Malformed, expired, badly signed or missing claims
        _ => Error::unauthenticated("Invalid token"),
    })?;

    Ok(token_data.claims)
}
