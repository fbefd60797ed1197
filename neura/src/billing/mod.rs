//! Plans, usage quotas and payments.
//!
//! - [`plans`]: the static plan catalog and one-time service price list
//! - [`service`]: [`Billing`], which ties subscriptions, monthly usage counters and payments to
//!   the configured [`PaymentProvider`](crate::payment_providers::PaymentProvider)
//!
//! Usage is counted per user per calendar month (UTC). Registration provisions a free
//! subscription; cancelling leaves the user on the free plan with no active subscription, and
//! [`Billing::reserve_usage`] refuses service until they subscribe again.

pub mod plans;
pub mod service;

pub use service::{Billing, UsageReservation};
