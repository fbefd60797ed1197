//! API request and response data models.
//!
//! These define the public API contract and are kept separate from the database models in
//! [`crate::db::models`], so storage can change without changing the API. All models derive
//! `utoipa::ToSchema` for the OpenAPI document.
//!
//! - [`api_keys`]: API key creation and listing (secrets are only returned on creation)
//! - [`billing`]: Plans, subscriptions, usage, payments and analytics
//! - [`products`]: Inputs and outputs of the AI services
//! - [`system`]: Service information and health
//! - [`users`]: The authenticated caller, registration and login

pub mod api_keys;
pub mod billing;
pub mod products;
pub mod system;
pub mod users;
