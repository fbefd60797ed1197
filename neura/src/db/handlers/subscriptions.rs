//! Database repository for plan subscriptions.

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::subscriptions::{
            SubscriptionCreateDBRequest, SubscriptionDBResponse, SubscriptionStatus, SubscriptionUpdateDBRequest,
        },
    },
    types::{SubscriptionId, UserId},
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, plan_id, provider_subscription_id, status, current_period_start, current_period_end, created_at";

/// Filter for listing subscriptions
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    pub user_id: Option<UserId>,
    pub status: Option<SubscriptionStatus>,
}

pub struct Subscriptions<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Subscriptions<'c> {
    type CreateRequest = SubscriptionCreateDBRequest;
    type UpdateRequest = SubscriptionUpdateDBRequest;
    type Response = SubscriptionDBResponse;
    type Id = SubscriptionId;
    type Filter = SubscriptionFilter;

    #[instrument(skip(self, request), fields(user_id = request.user_id, plan_id = %request.plan_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let subscription = sqlx::query_as::<_, SubscriptionDBResponse>(&format!(
            r#"
            INSERT INTO subscriptions (user_id, plan_id, provider_subscription_id, status, current_period_start, current_period_end, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(request.user_id)
        .bind(&request.plan_id)
        .bind(&request.provider_subscription_id)
        .bind(SubscriptionStatus::Active)
        .bind(request.current_period_start)
        .bind(request.current_period_end)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(subscription)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let subscription =
            sqlx::query_as::<_, SubscriptionDBResponse>(&format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = ?"))
                .bind(id)
                .fetch_optional(&mut *self.db)
                .await?;

        Ok(subscription)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<SubscriptionId>) -> Result<HashMap<Self::Id, SubscriptionDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id IN ("));
        let mut separated = query.separated(", ");
        for id in &ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let subscriptions = query
            .build_query_as::<SubscriptionDBResponse>()
            .fetch_all(&mut *self.db)
            .await?;

        Ok(subscriptions.into_iter().map(|s| (s.id, s)).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let subscriptions = sqlx::query_as::<_, SubscriptionDBResponse>(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
            WHERE (?1 IS NULL OR user_id = ?1) AND (?2 IS NULL OR status = ?2)
            ORDER BY id DESC
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.status)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(subscriptions)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let subscription = sqlx::query_as::<_, SubscriptionDBResponse>(&format!(
            r#"
            UPDATE subscriptions SET
                status = COALESCE(?, status),
                current_period_end = COALESCE(?, current_period_end)
            WHERE id = ?
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(request.status)
        .bind(request.current_period_end)
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(subscription)
    }
}

impl<'c> Subscriptions<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// The user's most recent active subscription
    #[instrument(skip(self), err)]
    pub async fn get_active_for_user(&mut self, user_id: UserId) -> Result<Option<SubscriptionDBResponse>> {
        let subscription = sqlx::query_as::<_, SubscriptionDBResponse>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = ? AND status = ? ORDER BY id DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(SubscriptionStatus::Active)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(subscription)
    }

    /// Mark every active subscription of the user cancelled. Returns how many were cancelled.
    #[instrument(skip(self), err)]
    pub async fn cancel_all_for_user(&mut self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("UPDATE subscriptions SET status = ? WHERE user_id = ? AND status = ?")
            .bind(SubscriptionStatus::Cancelled)
            .bind(user_id)
            .bind(SubscriptionStatus::Active)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_user;
    use chrono::Duration;
    use sqlx::SqlitePool;

    fn subscription(user_id: UserId, plan_id: &str) -> SubscriptionCreateDBRequest {
        let now = Utc::now();
        SubscriptionCreateDBRequest {
            user_id,
            plan_id: plan_id.to_string(),
            provider_subscription_id: None,
            current_period_start: now,
            current_period_end: now + Duration::days(30),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_subscription(pool: SqlitePool) {
        let user = create_test_user(&pool, "sub@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);

        let request = subscription(user.id, "starter");
        let created = repo.create(&request).await.unwrap();

        assert_eq!(created.status, SubscriptionStatus::Active);
        assert_eq!(created.plan_id, "starter");
        assert_eq!(created.current_period_end.timestamp(), request.current_period_end.timestamp());

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_active_subscription_is_latest(pool: SqlitePool) {
        let user = create_test_user(&pool, "latest@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);

        assert!(repo.get_active_for_user(user.id).await.unwrap().is_none());

        repo.create(&subscription(user.id, "free")).await.unwrap();
        let newer = repo.create(&subscription(user.id, "professional")).await.unwrap();

        let active = repo.get_active_for_user(user.id).await.unwrap().unwrap();
        assert_eq!(active.id, newer.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cancel_all_for_user(pool: SqlitePool) {
        let user = create_test_user(&pool, "cancel@example.com").await;
        let other = create_test_user(&pool, "keep@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);

        repo.create(&subscription(user.id, "free")).await.unwrap();
        repo.create(&subscription(user.id, "starter")).await.unwrap();
        repo.create(&subscription(other.id, "starter")).await.unwrap();

        assert_eq!(repo.cancel_all_for_user(user.id).await.unwrap(), 2);
        assert!(repo.get_active_for_user(user.id).await.unwrap().is_none());
        assert!(repo.get_active_for_user(other.id).await.unwrap().is_some());

        let cancelled = repo
            .list(&SubscriptionFilter {
                user_id: Some(user.id),
                status: Some(SubscriptionStatus::Cancelled),
            })
            .await
            .unwrap();
        assert_eq!(cancelled.len(), 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_and_delete(pool: SqlitePool) {
        let user = create_test_user(&pool, "upd@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);

        let created = repo.create(&subscription(user.id, "starter")).await.unwrap();
        let updated = repo
            .update(
                created.id,
                &SubscriptionUpdateDBRequest {
                    status: Some(SubscriptionStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, SubscriptionStatus::Cancelled);
        assert_eq!(updated.plan_id, "starter");

        assert_eq!(repo.get_bulk(vec![created.id]).await.unwrap().len(), 1);
        assert!(repo.delete(created.id).await.unwrap());
        assert!(matches!(
            repo.update(created.id, &SubscriptionUpdateDBRequest::default()).await,
            Err(DbError::NotFound)
        ));
    }
}
