//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with SQLite.
//! It follows the Repository pattern to provide clean abstractions over database operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers, billing service)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   SQLite    │
//! └─────────────┘
//! ```
//!
//! # Transactions
//!
//! Repositories borrow a `&mut SqliteConnection`, so they work equally over a pooled connection
//! or a transaction. Multi-step writes should always go through a transaction:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let user = Users::new(&mut tx).create(&request).await?;
//! Subscriptions::new(&mut tx).create(&free_plan(user.id)).await?;
//! tx.commit().await?;
//! ```
//!
//! # Migrations
//!
//! Migrations live in `migrations/` and are applied on startup through [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;

use std::str::FromStr;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::info;

use crate::config::DatabaseConfig;

/// Open the connection pool described by `config`, with foreign keys enforced.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(config.create_if_missing)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    info!(url = %config.url, max_connections = config.max_connections, "Database pool ready");
    Ok(pool)
}

/// Cheap liveness probe used by `/health`.
pub async fn ping(pool: &SqlitePool) -> bool {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            false
        }
    }
}
