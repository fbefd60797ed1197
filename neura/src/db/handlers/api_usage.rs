//! Per-request usage records for API-key callers.

use crate::{
    db::{
        errors::Result,
        models::api_usage::{ApiUsageCreateDBRequest, UsageStats},
    },
    types::UserId,
};
use chrono::Utc;
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

#[derive(Debug, FromRow)]
struct UsageAggregate {
    total_requests: i64,
    avg_response_time: Option<f64>,
    unique_endpoints: i64,
}

pub struct ApiUsage<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> ApiUsage<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(api_key_id = request.api_key_id, endpoint = %request.endpoint), err)]
    pub async fn record(&mut self, request: &ApiUsageCreateDBRequest) -> Result<()> {
        sqlx::query("INSERT INTO api_usage (api_key_id, endpoint, timestamp, response_time, status_code) VALUES (?, ?, ?, ?, ?)")
            .bind(request.api_key_id)
            .bind(&request.endpoint)
            .bind(Utc::now())
            .bind(request.response_time)
            .bind(request.status_code)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    /// Aggregate usage across every key the user owns, active or not
    #[instrument(skip(self), err)]
    pub async fn stats_for_user(&mut self, user_id: UserId) -> Result<UsageStats> {
        let aggregate = sqlx::query_as::<_, UsageAggregate>(
            r#"
            SELECT
                COUNT(au.id) AS total_requests,
                AVG(au.response_time) AS avg_response_time,
                COUNT(DISTINCT au.endpoint) AS unique_endpoints
            FROM api_usage au
            JOIN api_keys ak ON ak.id = au.api_key_id
            WHERE ak.user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(UsageStats {
            total_requests: aggregate.total_requests,
            avg_response_time: aggregate.avg_response_time.unwrap_or(0.0),
            unique_endpoints: aggregate.unique_endpoints,
        })
    }
}
