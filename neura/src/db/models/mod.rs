//! Database record models matching table schemas.
//!
//! These structs are the repositories' inputs and outputs. They are kept apart from the API
//! models in [`crate::api::models`] so storage and wire formats can evolve independently.
//!
//! - [`users`]: User accounts and their current plan
//! - [`api_keys`]: Hashed API keys and their owners
//! - [`api_usage`]: Per-request usage records and aggregates
//! - [`subscriptions`]: Plan subscriptions and billing periods
//! - [`payments`]: Recorded charges, in integer cents

pub mod api_keys;
pub mod api_usage;
pub mod payments;
pub mod subscriptions;
pub mod users;
