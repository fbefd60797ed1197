//! Per-user request counters, one row per billing month.

use crate::{db::errors::Result, types::UserId};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::instrument;

pub struct MonthlyUsage<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> MonthlyUsage<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Requests counted for `month` (`YYYY-MM`), 0 if there is no row yet
    #[instrument(skip(self), err)]
    pub async fn requests_for(&mut self, user_id: UserId, month: &str) -> Result<i64> {
        let count: Option<i64> = sqlx::query_scalar("SELECT requests_count FROM monthly_usage WHERE user_id = ? AND month = ?")
            .bind(user_id)
            .bind(month)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(count.unwrap_or(0))
    }

    /// Add one request to the month's counter, creating the row on first use. Returns the new count.
    #[instrument(skip(self), err)]
    pub async fn increment(&mut self, user_id: UserId, month: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO monthly_usage (user_id, month, requests_count, created_at)
            VALUES (?, ?, 1, ?)
            ON CONFLICT (user_id, month) DO UPDATE SET requests_count = requests_count + 1
            RETURNING requests_count
            "#,
        )
        .bind(user_id)
        .bind(month)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }

    /// Add one request to the month's counter only while it is below `limit`.
    /// Returns the new count, or `None` when the quota is already used up.
    #[instrument(skip(self), err)]
    pub async fn reserve(&mut self, user_id: UserId, month: &str, limit: i64) -> Result<Option<i64>> {
        if limit <= 0 {
            return Ok(None);
        }

        let count: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO monthly_usage (user_id, month, requests_count, created_at)
            VALUES (?, ?, 1, ?)
            ON CONFLICT (user_id, month) DO UPDATE SET requests_count = requests_count + 1
            WHERE requests_count < ?
            RETURNING requests_count
            "#,
        )
        .bind(user_id)
        .bind(month)
        .bind(Utc::now())
        .bind(limit)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(count)
    }

    /// Give back a request taken by [`reserve`](Self::reserve)
    #[instrument(skip(self), err)]
    pub async fn release(&mut self, user_id: UserId, month: &str) -> Result<()> {
        sqlx::query("UPDATE monthly_usage SET requests_count = MAX(requests_count - 1, 0) WHERE user_id = ? AND month = ?")
            .bind(user_id)
            .bind(month)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_user;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_increment_upserts(pool: SqlitePool) {
        let user = create_test_user(&pool, "count@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = MonthlyUsage::new(&mut conn);

        assert_eq!(repo.requests_for(user.id, "2025-06").await.unwrap(), 0);

        assert_eq!(repo.increment(user.id, "2025-06").await.unwrap(), 1);
        assert_eq!(repo.increment(user.id, "2025-06").await.unwrap(), 2);
        assert_eq!(repo.increment(user.id, "2025-07").await.unwrap(), 1);

        assert_eq!(repo.requests_for(user.id, "2025-06").await.unwrap(), 2);
        assert_eq!(repo.requests_for(user.id, "2025-07").await.unwrap(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_counters_are_per_user(pool: SqlitePool) {
        let a = create_test_user(&pool, "a@example.com").await;
        let b = create_test_user(&pool, "b@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = MonthlyUsage::new(&mut conn);

        repo.increment(a.id, "2025-06").await.unwrap();
        repo.increment(a.id, "2025-06").await.unwrap();
        repo.increment(b.id, "2025-06").await.unwrap();

        assert_eq!(repo.requests_for(a.id, "2025-06").await.unwrap(), 2);
        assert_eq!(repo.requests_for(b.id, "2025-06").await.unwrap(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_reserve_stops_at_limit(pool: SqlitePool) {
        let user = create_test_user(&pool, "reserve@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = MonthlyUsage::new(&mut conn);

        assert_eq!(repo.reserve(user.id, "2025-06", 2).await.unwrap(), Some(1));
        assert_eq!(repo.reserve(user.id, "2025-06", 2).await.unwrap(), Some(2));
        assert_eq!(repo.reserve(user.id, "2025-06", 2).await.unwrap(), None);
        assert_eq!(repo.requests_for(user.id, "2025-06").await.unwrap(), 2);

        repo.release(user.id, "2025-06").await.unwrap();
        assert_eq!(repo.requests_for(user.id, "2025-06").await.unwrap(), 1);
        assert_eq!(repo.reserve(user.id, "2025-06", 2).await.unwrap(), Some(2));

        assert_eq!(repo.reserve(user.id, "2025-07", 0).await.unwrap(), None);
        assert_eq!(repo.requests_for(user.id, "2025-07").await.unwrap(), 0);
    }
}
