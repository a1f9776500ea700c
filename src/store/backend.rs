//! Backend trait for subscription storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend is temporarily unavailable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A registered browser push endpoint with its encryption keys and
/// delivery health counters.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    /// Push-service endpoint URL
    pub endpoint: String,
    /// Authentication secret from the browser subscription
    pub auth: String,
    /// P-256 ECDH public key from the browser subscription
    pub p256dh: String,
    /// False once the push service reported the endpoint permanently gone
    pub active: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub success_count: i64,
    pub failure_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a subscription.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub endpoint: String,
    pub auth: String,
    pub p256dh: String,
}

/// Aggregate counters across all stored subscriptions.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubscriptionTotals {
    pub total: i64,
    pub active: i64,
    pub total_successes: i64,
    pub total_failures: i64,
    /// Mean per-subscription success ratio over subscriptions with at
    /// least one delivery attempt, in [0, 1]
    pub average_success_rate: f64,
}

/// Storage contract consumed by the dispatcher and the HTTP API.
///
/// Counter updates are single-statement atomic increments keyed by
/// subscription identity; there are no cross-subscription transactions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// All subscriptions that are currently eligible for delivery.
    ///
    /// Loads the full set in one call. Fleet size is assumed bounded;
    /// pagination is a known scaling limit.
    async fn list_active(&self) -> Result<Vec<Subscription>, StoreError>;

    /// Stamp `last_success` and increment `success_count`.
    async fn record_success(&self, id: Uuid) -> Result<(), StoreError>;

    /// Stamp `last_failure` and increment `failure_count`.
    async fn record_failure(&self, id: Uuid) -> Result<(), StoreError>;

    /// Soft-delete after the push service reported the endpoint gone.
    /// Historical counters are preserved.
    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError>;

    /// Lookup by full subscription identity, for idempotent registration.
    async fn find_by_endpoint_and_keys(
        &self,
        endpoint: &str,
        auth: &str,
        p256dh: &str,
    ) -> Result<Option<Subscription>, StoreError>;

    /// Insert a new subscription. Re-registering an existing identity
    /// returns the stored record without duplicating it.
    async fn insert(&self, subscription: NewSubscription) -> Result<Subscription, StoreError>;

    /// Hard delete on explicit unsubscribe. Returns whether a record
    /// was removed.
    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<bool, StoreError>;

    /// Aggregate counters, computed store-side.
    async fn totals(&self) -> Result<SubscriptionTotals, StoreError>;

    /// Connectivity probe for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;
}
