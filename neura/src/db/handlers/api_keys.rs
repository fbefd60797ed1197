//! Database repository for API keys.

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::api_keys::{ApiKeyCreateDBRequest, ApiKeyDBResponse, ApiKeyOwner, ApiKeyUpdateDBRequest},
    },
    types::{ApiKeyId, UserId},
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;

const API_KEY_COLUMNS: &str = "id, user_id, key_hash, key_prefix, name, usage_count, rate_limit, created_at, last_used, is_active";

/// Filter for listing API keys
#[derive(Debug, Clone)]
pub struct ApiKeyFilter {
    pub skip: i64,
    pub limit: i64,
    pub user_id: Option<UserId>,
}

impl ApiKeyFilter {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            skip: 0,
            limit: i64::MAX,
            user_id: Some(user_id),
        }
    }
}

pub struct ApiKeys<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for ApiKeys<'c> {
    type CreateRequest = ApiKeyCreateDBRequest;
    type UpdateRequest = ApiKeyUpdateDBRequest;
    type Response = ApiKeyDBResponse;
    type Id = ApiKeyId;
    type Filter = ApiKeyFilter;

    #[instrument(skip(self, request), fields(user_id = request.user_id, name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let api_key = sqlx::query_as::<_, ApiKeyDBResponse>(&format!(
            r#"
            INSERT INTO api_keys (user_id, key_hash, key_prefix, name, rate_limit, created_at)
            VALUES (?, ?, ?, ?, COALESCE(?, 1000), ?)
            RETURNING {API_KEY_COLUMNS}
            "#
        ))
        .bind(request.user_id)
        .bind(&request.key_hash)
        .bind(&request.key_prefix)
        .bind(&request.name)
        .bind(request.rate_limit)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(api_key)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let api_key = sqlx::query_as::<_, ApiKeyDBResponse>(&format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(api_key)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<ApiKeyId>) -> Result<HashMap<Self::Id, ApiKeyDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE id IN ("));
        let mut separated = query.separated(", ");
        for id in &ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let keys = query.build_query_as::<ApiKeyDBResponse>().fetch_all(&mut *self.db).await?;

        Ok(keys.into_iter().map(|key| (key.id, key)).collect())
    }

    #[instrument(skip(self, filter), fields(user_id = ?filter.user_id), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let keys = sqlx::query_as::<_, ApiKeyDBResponse>(&format!(
            r#"
            SELECT {API_KEY_COLUMNS} FROM api_keys
            WHERE (?1 IS NULL OR user_id = ?1)
            ORDER BY id DESC
            LIMIT ?2 OFFSET ?3
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(keys)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let api_key = sqlx::query_as::<_, ApiKeyDBResponse>(&format!(
            r#"
            UPDATE api_keys SET
                name = COALESCE(?, name),
                is_active = COALESCE(?, is_active)
            WHERE id = ?
            RETURNING {API_KEY_COLUMNS}
            "#
        ))
        .bind(&request.name)
        .bind(request.is_active)
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(api_key)
    }
}

impl<'c> ApiKeys<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Resolve a key hash to its owner. Both the key and the user must be active.
    #[instrument(skip(self, key_hash), err)]
    pub async fn authenticate(&mut self, key_hash: &str) -> Result<Option<ApiKeyOwner>> {
        let owner = sqlx::query_as::<_, ApiKeyOwner>(
            r#"
            SELECT ak.id AS api_key_id, u.id AS user_id, u.email, u.plan, ak.usage_count, ak.rate_limit
            FROM api_keys ak
            JOIN users u ON u.id = ak.user_id
            WHERE ak.key_hash = ? AND ak.is_active = 1 AND u.is_active = 1
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(owner)
    }

    /// Bump `usage_count` and stamp `last_used`
    #[instrument(skip(self), err)]
    pub async fn record_use(&mut self, id: ApiKeyId) -> Result<()> {
        sqlx::query("UPDATE api_keys SET usage_count = usage_count + 1, last_used = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    /// Deactivate a key, but only if `user_id` owns it. Returns whether a key was deactivated.
    #[instrument(skip(self), err)]
    pub async fn deactivate_for_user(&mut self, id: ApiKeyId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("UPDATE api_keys SET is_active = 0 WHERE id = ? AND user_id = ? AND is_active = 1")
            .bind(id)
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
