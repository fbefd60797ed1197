//! Database repository for payments.

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::payments::{PaymentCreateDBRequest, PaymentDBResponse, PaymentUpdateDBRequest},
    },
    types::{PaymentId, UserId},
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;

const PAYMENT_COLUMNS: &str =
    "id, user_id, subscription_id, provider_payment_id, service_id, amount_cents, currency, status, created_at";

/// Filter for listing payments
#[derive(Debug, Clone)]
pub struct PaymentFilter {
    pub user_id: Option<UserId>,
    pub limit: i64,
}

impl PaymentFilter {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            limit: 100,
        }
    }
}

pub struct Payments<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Payments<'c> {
    type CreateRequest = PaymentCreateDBRequest;
    type UpdateRequest = PaymentUpdateDBRequest;
    type Response = PaymentDBResponse;
    type Id = PaymentId;
    type Filter = PaymentFilter;

    /// Record a payment. A repeated `provider_payment_id` is a unique violation on
    /// `payments.provider_payment_id`, which callers treat as "already processed".
    #[instrument(skip(self, request), fields(user_id = request.user_id, amount_cents = request.amount_cents), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(&format!(
            r#"
            INSERT INTO payments (user_id, subscription_id, provider_payment_id, service_id, amount_cents, currency, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(request.user_id)
        .bind(request.subscription_id)
        .bind(&request.provider_payment_id)
        .bind(&request.service_id)
        .bind(request.amount_cents)
        .bind(&request.currency)
        .bind(&request.status)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(payment)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(payment)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<PaymentId>) -> Result<HashMap<Self::Id, PaymentDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id IN ("));
        let mut separated = query.separated(", ");
        for id in &ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let payments = query.build_query_as::<PaymentDBResponse>().fetch_all(&mut *self.db).await?;

        Ok(payments.into_iter().map(|p| (p.id, p)).collect())
    }

    /// Newest first
    #[instrument(skip(self, filter), fields(user_id = ?filter.user_id), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let payments = sqlx::query_as::<_, PaymentDBResponse>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE (?1 IS NULL OR user_id = ?1)
            ORDER BY id DESC
            LIMIT ?2
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(payments)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM payments WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(status = %request.status), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(&format!(
            "UPDATE payments SET status = ? WHERE id = ? RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(&request.status)
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(payment)
    }
}

impl<'c> Payments<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_provider_id(&mut self, provider_payment_id: &str) -> Result<Option<PaymentDBResponse>> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE provider_payment_id = ?"
        ))
        .bind(provider_payment_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(payment)
    }
}
