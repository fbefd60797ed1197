//! HTTP API: route handlers and their request/response models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`extract`]**: Extractors that reject with the API's error body
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - **System** (`/`, `/health`, `/dashboard`): Service information, health and the dashboard page
//! - **Auth** (`/auth/*`): Registration, login and API key management
//! - **Billing** (`/billing/*`): Plans, subscriptions, usage and one-time payments
//! - **Services** (`/api/*`): The AI services, metered by [`crate::limits::track_usage`]
//! - **Analytics** (`/analytics/dashboard`): Aggregated account data
//! - **Realtime** (`/ws/{client_id}`): WebSocket broadcast
//!
//! The OpenAPI document is served at `/openapi.json` and rendered at `/docs`.

pub mod extract;
pub mod handlers;
pub mod models;
