//! Authentication.
//!
//! Callers authenticate with `Authorization: Bearer <token>`, where the token is either:
//!
//! - **An API key**, recognised by the configured prefix (`neura_` by default). Keys are issued at
//!   registration and through `POST /auth/api-key`, stored only as SHA-256 hashes and revoked by
//!   deactivation. Rate limits and usage records are kept per key.
//! - **A session token**, an HS256 JWT returned by `POST /auth/login`.
//!
//! Handlers take [`CurrentUser`](crate::api::models::users::CurrentUser) as an extractor:
//!
//! ```ignore
//! async fn handler(current_user: CurrentUser) -> Result<Json<Value>> {
//!     Ok(Json(json!({ "email": current_user.email })))
//! }
//! ```
//!
//! # Modules
//!
//! - [`current_user`]: The `CurrentUser` extractor
//! - [`password`]: Argon2id password hashing
//! - [`session`]: JWT session tokens

pub mod current_user;
pub mod password;
pub mod session;
