//! Subscription store factory

use std::sync::Arc;

use crate::config::DatabaseConfig;

use super::backend::{StoreError, SubscriptionStore};
use super::memory_backend::MemorySubscriptionStore;
use super::postgres_backend::PostgresSubscriptionStore;

/// Create a subscription store based on configuration.
///
/// - `"postgres"` (default): connects a PostgreSQL pool
/// - `"memory"`: in-memory store for local development and tests
pub async fn create_subscription_store(
    config: &DatabaseConfig,
) -> Result<Arc<dyn SubscriptionStore>, StoreError> {
    match config.backend.as_str() {
        "memory" => {
            tracing::info!(backend = "memory", "Creating in-memory subscription store");
            Ok(Arc::new(MemorySubscriptionStore::new()))
        }
        _ => {
            tracing::info!(backend = "postgres", "Creating PostgreSQL subscription store");
            let store = PostgresSubscriptionStore::connect(config).await?;
            Ok(Arc::new(store))
        }
    }
}
