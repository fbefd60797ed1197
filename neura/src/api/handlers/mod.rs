//! HTTP request handlers, organized by resource.
//!
//! - [`analytics`]: Per-user dashboard data
//! - [`api_keys`]: API key issuance, listing and revocation
//! - [`auth`]: Registration and login
//! - [`billing`]: Plans, subscriptions, usage and payments
//! - [`products`]: The AI service endpoints
//! - [`system`]: Service information, health and dashboard page
//! - [`ws`]: WebSocket broadcast hub
//!
//! Handlers authenticate with the [`CurrentUser`](crate::api::models::users::CurrentUser)
//! extractor and return [`crate::errors::Error`], which renders as `{"detail": ...}` JSON.

pub mod analytics;
pub mod api_keys;
pub mod auth;
pub mod billing;
pub mod products;
pub mod system;
pub mod ws;
