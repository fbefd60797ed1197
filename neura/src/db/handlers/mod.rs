//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut SqliteConnection` (a pooled connection or a transaction) and
//! provides strongly-typed operations returning models from [`crate::db::models`].
//!
//! Entity-shaped repositories implement the [`Repository`] trait:
//!
//! - [`Users`]: User accounts and plan assignment
//! - [`ApiKeys`]: API key storage, authentication lookups and revocation
//! - [`Subscriptions`]: Plan subscriptions
//! - [`Payments`]: Recorded charges
//!
//! Counters and logs have narrower APIs:
//!
//! - [`ApiUsage`]: Per-request usage records and aggregates
//! - [`MonthlyUsage`]: Monthly request counters
//!
//! ```ignore
//! use neura::db::handlers::{Repository, Users};
//!
//! let mut conn = pool.acquire().await?;
//! let user = Users::new(&mut conn).get_user_by_email("user@example.com").await?;
//! ```

pub mod api_keys;
pub mod api_usage;
pub mod monthly_usage;
pub mod payments;
pub mod repository;
pub mod subscriptions;
pub mod users;

pub use api_keys::ApiKeys;
pub use api_usage::ApiUsage;
pub use monthly_usage::MonthlyUsage;
pub use payments::Payments;
pub use repository::Repository;
pub use subscriptions::Subscriptions;
pub use users::Users;
