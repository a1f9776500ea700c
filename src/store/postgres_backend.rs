//! PostgreSQL-backed subscription store.
//!
//! Table structure:
//!
//! ```sql
//! CREATE TABLE push_subscriptions (
//!     id            UUID PRIMARY KEY,
//!     endpoint      TEXT NOT NULL,
//!     auth          TEXT NOT NULL,
//!     p256dh        TEXT NOT NULL,
//!     active        BOOLEAN NOT NULL DEFAULT TRUE,
//!     last_success  TIMESTAMPTZ,
//!     last_failure  TIMESTAMPTZ,
//!     success_count BIGINT NOT NULL DEFAULT 0,
//!     failure_count BIGINT NOT NULL DEFAULT 0,
//!     created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     UNIQUE (endpoint, auth, p256dh)
//! );
//! ```
//!
//! Counter updates are single-statement increments so that two dispatch
//! runs racing on the same subscription never lose updates.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::config::DatabaseConfig;

use super::backend::{
    NewSubscription, StoreError, Subscription, SubscriptionStore, SubscriptionTotals,
};

const SUBSCRIPTION_COLUMNS: &str =
    "id, endpoint, auth, p256dh, active, last_success, last_failure, \
     success_count, failure_count, created_at";

pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    /// Connect a new pool from configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds as u64))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds as u64))
            .connect(&config.url)
            .await?;

        tracing::info!(
            pool_size = config.pool_size,
            "PostgreSQL connection pool created"
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn list_active(&self) -> Result<Vec<Subscription>, StoreError> {
        let rows = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {} FROM push_subscriptions WHERE active = TRUE",
            SUBSCRIPTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn record_success(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE push_subscriptions
            SET last_success = NOW(), success_count = success_count + 1
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_failure(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE push_subscriptions
            SET last_failure = NOW(), failure_count = failure_count + 1
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE push_subscriptions SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(subscription_id = %id, "Deactivate matched no subscription");
        }

        Ok(())
    }

    async fn find_by_endpoint_and_keys(
        &self,
        endpoint: &str,
        auth: &str,
        p256dh: &str,
    ) -> Result<Option<Subscription>, StoreError> {
        let row = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {} FROM push_subscriptions \
             WHERE endpoint = $1 AND auth = $2 AND p256dh = $3",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(endpoint)
        .bind(auth)
        .bind(p256dh)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn insert(&self, subscription: NewSubscription) -> Result<Subscription, StoreError> {
        // ON CONFLICT keeps registration idempotent under concurrent
        // submissions of the same subscription; re-registering a
        // deactivated endpoint makes it eligible again.
        let row = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            INSERT INTO push_subscriptions (id, endpoint, auth, p256dh, active)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (endpoint, auth, p256dh) DO UPDATE SET active = TRUE
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&subscription.endpoint)
        .bind(&subscription.auth)
        .bind(&subscription.p256dh)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = $1")
            .bind(endpoint)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn totals(&self) -> Result<SubscriptionTotals, StoreError> {
        let totals = sqlx::query_as::<_, SubscriptionTotals>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE active) AS active,
                COALESCE(SUM(success_count), 0)::BIGINT AS total_successes,
                COALESCE(SUM(failure_count), 0)::BIGINT AS total_failures,
                COALESCE(AVG(
                    success_count::FLOAT8
                    / NULLIF(success_count + failure_count, 0)::FLOAT8
                ), 0)::FLOAT8 AS average_success_rate
            FROM push_subscriptions
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
